use crate::app::command_support::{load_settings, parse_flags, slot_root_for};
use crate::workspace::unlock_slots;

pub fn cmd_unlock(args: &[String]) -> Result<String, String> {
    let parsed = parse_flags(
        args,
        &["--subagent", "--target-root", "--config"],
        &["--all", "--dry-run"],
    )?;
    if !parsed.positionals.is_empty() {
        return Err(
            "usage: unlock (--subagent <name> | --all) [--target-root <dir>] [--dry-run]"
                .to_string(),
        );
    }
    let settings = load_settings(parsed.path("--config").as_deref())?;
    let root = slot_root_for(&settings, &parsed)?;
    let dry_run = parsed.switch("--dry-run");
    let unlocked = unlock_slots(
        &root,
        &settings.lock_name,
        parsed.value("--subagent"),
        parsed.switch("--all"),
        dry_run,
    )
    .map_err(|e| e.to_string())?;

    let verb = if dry_run { "would unlock" } else { "unlocked" };
    if unlocked.is_empty() {
        return Ok("no locked subagents".to_string());
    }
    Ok(unlocked
        .iter()
        .map(|dir| format!("{verb} {}", dir.display()))
        .collect::<Vec<_>>()
        .join("\n"))
}
