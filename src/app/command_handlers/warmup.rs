use crate::app::command_support::{load_settings, parse_flags, run_log, slot_root_for};
use crate::workspace::{warmup_slots, ProcessLauncher, WarmupReport};

pub fn cmd_warmup(args: &[String]) -> Result<String, String> {
    let parsed = parse_flags(
        args,
        &["--subagents", "--target-root", "--config"],
        &["--dry-run"],
    )?;
    if !parsed.positionals.is_empty() {
        return Err("usage: warmup [--subagents <n>] [--target-root <dir>]".to_string());
    }
    let settings = load_settings(parsed.path("--config").as_deref())?;
    let root = slot_root_for(&settings, &parsed)?;
    let count = parsed.count("--subagents", 1)?;
    let report = warmup_slots(
        &root,
        count,
        &settings.editor_command,
        parsed.switch("--dry-run"),
        &ProcessLauncher,
        &run_log(&settings)?,
    )
    .map_err(|e| e.to_string())?;
    Ok(render_warmup(&report, &settings.editor_command))
}

pub(crate) fn render_warmup(report: &WarmupReport, editor: &str) -> String {
    let mut lines: Vec<String> = report
        .opened
        .iter()
        .map(|path| format!("opened {} with {editor}", path.display()))
        .collect();
    lines.extend(
        report
            .failed
            .iter()
            .map(|(path, err)| format!("failed to open {}: {err}", path.display())),
    );
    lines.join("\n")
}
