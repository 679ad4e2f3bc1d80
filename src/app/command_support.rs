use crate::config::{self, ConfigError, Settings};
use crate::shared::logging::{dispatch_log_path, RunLog};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, String> {
    config::load_settings(explicit).map_err(map_config_err)
}

pub fn run_log(settings: &Settings) -> Result<RunLog, String> {
    let state_root = settings.resolve_state_root().map_err(map_config_err)?;
    Ok(RunLog::to_file(dispatch_log_path(&state_root)))
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positionals: Vec<String>,
    values: BTreeMap<String, String>,
    switches: BTreeSet<String>,
}

impl ParsedArgs {
    pub fn value(&self, flag: &str) -> Option<&str> {
        self.values.get(flag).map(String::as_str)
    }

    pub fn path(&self, flag: &str) -> Option<PathBuf> {
        self.value(flag).map(PathBuf::from)
    }

    pub fn switch(&self, flag: &str) -> bool {
        self.switches.contains(flag)
    }

    pub fn count(&self, flag: &str, default: usize) -> Result<usize, String> {
        match self.value(flag) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| format!("{flag} must be a positive integer, got `{raw}`")),
        }
    }
}

pub fn parse_flags(
    args: &[String],
    value_flags: &[&str],
    switch_flags: &[&str],
) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut i = 0usize;
    while i < args.len() {
        let arg = args[i].as_str();
        if value_flags.contains(&arg) {
            let Some(value) = args.get(i + 1) else {
                return Err(format!("{arg} requires a value"));
            };
            parsed.values.insert(arg.to_string(), value.clone());
            i += 2;
            continue;
        }
        if switch_flags.contains(&arg) {
            parsed.switches.insert(arg.to_string());
        } else if arg.starts_with("--") {
            return Err(format!("unexpected argument `{arg}`"));
        } else {
            parsed.positionals.push(arg.to_string());
        }
        i += 1;
    }
    Ok(parsed)
}

pub fn slot_root_for(settings: &Settings, parsed: &ParsedArgs) -> Result<PathBuf, String> {
    match parsed.path("--target-root") {
        Some(root) => Ok(root),
        None => settings.resolve_slot_root().map_err(map_config_err),
    }
}
