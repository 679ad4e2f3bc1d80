use crate::app::command_support::{load_settings, map_config_err, parse_flags};
use crate::dispatch::{BatchFile, Dispatcher, RunReport, ThreadSleeper};
use crate::instruction::{locate_or_generate, DirectoryLocator, InstructionDocument};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const USAGE: &str =
    "usage: dispatch <batch.yaml> [--instructions <path>] [--context <dir>] [--config <path>]";

pub fn cmd_dispatch(args: &[String]) -> Result<String, String> {
    let parsed = parse_flags(args, &["--instructions", "--context", "--config"], &[])?;
    let [batch_arg] = parsed.positionals.as_slice() else {
        return Err(USAGE.to_string());
    };
    let batch_path = Path::new(batch_arg);
    let settings = load_settings(parsed.path("--config").as_deref())?;
    let batch = BatchFile::load(batch_path).map_err(|e| e.to_string())?;

    let instruction_path = match parsed
        .path("--instructions")
        .or_else(|| batch.resolved_instructions(batch_path))
    {
        Some(path) => path,
        None => {
            let context = parsed.path("--context").unwrap_or_else(|| {
                batch_path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            });
            let state_root = settings.resolve_state_root().map_err(map_config_err)?;
            locate_or_generate(&DirectoryLocator, &context, &state_root)
                .map_err(|e| e.to_string())?
        }
    };
    let instruction = InstructionDocument::load(&instruction_path).map_err(|e| e.to_string())?;

    let dispatcher =
        Dispatcher::from_settings(&settings, None, Arc::new(ThreadSleeper)).map_err(map_config_err)?;
    let report = dispatcher
        .run(instruction, &batch.queries)
        .map_err(|e| e.to_string())?;
    Ok(render_report(&report, &instruction_path))
}

pub fn render_report(report: &RunReport, instruction_path: &Path) -> String {
    let mut lines = vec![
        format!("run={}", report.run_id),
        format!("instructions={}", instruction_path.display()),
        format!("imports={}", report.imports.len()),
    ];
    for (index, group) in report.groups.iter().enumerate() {
        for outcome in group {
            lines.push(String::new());
            lines.push(format!(
                "[group {index}] {} (retries={})",
                outcome.query_id, outcome.dispatch.retries
            ));
            lines.push(outcome.render_line());
        }
    }
    lines.push(String::new());
    lines.push(format!("failed={}", report.failed_count()));
    lines.join("\n")
}
