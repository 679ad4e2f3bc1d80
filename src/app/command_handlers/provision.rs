use super::warmup::render_warmup;
use crate::app::command_support::{load_settings, parse_flags, run_log, slot_root_for};
use crate::workspace::{provision_slots, warmup_slots, ProcessLauncher, ProvisionRequest};

pub fn cmd_provision(args: &[String]) -> Result<String, String> {
    let parsed = parse_flags(
        args,
        &["--subagents", "--template", "--target-root", "--config"],
        &["--force", "--dry-run", "--warmup"],
    )?;
    if !parsed.positionals.is_empty() {
        return Err(
            "usage: provision [--subagents <n>] [--template <dir>] [--target-root <dir>] [--force] [--dry-run] [--warmup]"
                .to_string(),
        );
    }
    let settings = load_settings(parsed.path("--config").as_deref())?;
    let root = slot_root_for(&settings, &parsed)?;
    let template = parsed.path("--template").or_else(|| settings.template.clone());
    let count = parsed.count("--subagents", 1)?;
    let dry_run = parsed.switch("--dry-run");

    let report = provision_slots(ProvisionRequest {
        template: template.as_deref(),
        target_root: &root,
        count,
        lock_name: &settings.lock_name,
        force: parsed.switch("--force"),
        dry_run,
    })
    .map_err(|e| e.to_string())?;

    let created_verb = if dry_run { "would create" } else { "created" };
    let mut lines = Vec::new();
    lines.extend(
        report
            .created
            .iter()
            .map(|dir| format!("{created_verb} {}", dir.display())),
    );
    lines.extend(
        report
            .skipped_existing
            .iter()
            .map(|dir| format!("skipped existing {}", dir.display())),
    );
    lines.extend(
        report
            .skipped_locked
            .iter()
            .map(|dir| format!("skipped locked {}", dir.display())),
    );

    // A dry run creates nothing to open.
    if parsed.switch("--warmup") && !dry_run {
        let warmed = warmup_slots(
            &root,
            count,
            &settings.editor_command,
            false,
            &ProcessLauncher,
            &run_log(&settings)?,
        )
        .map_err(|e| e.to_string())?;
        lines.push(render_warmup(&warmed, &settings.editor_command));
    }
    Ok(lines.join("\n"))
}
