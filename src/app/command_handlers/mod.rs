use crate::app::cli::{help_text, parse_cli_verb, CliVerb};

pub mod dispatch;
pub mod imports;
pub mod list;
pub mod provision;
pub mod unlock;
pub mod warmup;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Dispatch => dispatch::cmd_dispatch(&args[1..]),
        CliVerb::Imports => imports::cmd_imports(&args[1..]),
        CliVerb::Provision => provision::cmd_provision(&args[1..]),
        CliVerb::Unlock => unlock::cmd_unlock(&args[1..]),
        CliVerb::List => list::cmd_list(&args[1..]),
        CliVerb::Warmup => warmup::cmd_warmup(&args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
