use crate::app::command_support::{load_settings, parse_flags, slot_root_for};
use crate::workspace::slot_statuses;

pub fn cmd_list(args: &[String]) -> Result<String, String> {
    let parsed = parse_flags(args, &["--target-root", "--config"], &[])?;
    if !parsed.positionals.is_empty() {
        return Err("usage: list [--target-root <dir>]".to_string());
    }
    let settings = load_settings(parsed.path("--config").as_deref())?;
    let root = slot_root_for(&settings, &parsed)?;
    let statuses = slot_statuses(&root, &settings.lock_name).map_err(|e| e.to_string())?;
    if statuses.is_empty() {
        return Ok(format!("no subagents in {}", root.display()));
    }
    Ok(statuses
        .iter()
        .map(|status| {
            format!(
                "{} locked={} workspace={} path={}",
                status.slot.name(),
                status.locked,
                status.has_workspace,
                status.slot.dir.display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}
