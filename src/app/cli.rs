#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Dispatch,
    Imports,
    Provision,
    Unlock,
    List,
    Warmup,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "dispatch" => CliVerb::Dispatch,
        "imports" => CliVerb::Imports,
        "provision" => CliVerb::Provision,
        "unlock" => CliVerb::Unlock,
        "list" => CliVerb::List,
        "warmup" => CliVerb::Warmup,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  dispatch <batch.yaml> [--instructions P] [--context DIR] [--config P]".to_string(),
        "                                       Run a batch of queries group by group".to_string(),
        "  imports <instruction.md>             Print the files an instruction document imports"
            .to_string(),
        "  provision [--subagents N] [--template DIR] [--target-root DIR] [--force] [--dry-run] [--warmup]"
            .to_string(),
        "                                       Create or refresh subagent workspaces".to_string(),
        "  unlock (--subagent NAME | --all) [--target-root DIR] [--dry-run]".to_string(),
        "                                       Remove subagent lock files".to_string(),
        "  list [--target-root DIR]             Show subagent workspaces and lock state"
            .to_string(),
        "  warmup [--subagents N] [--target-root DIR]".to_string(),
        "                                       Open subagent workspaces in the editor".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
