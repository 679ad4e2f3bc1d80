use super::slots::{ensure_slot_layout, list_slots, WorkerSlot, WORKSPACE_TEMPLATE_FILE};
use super::{io_error, WorkspaceError};
use crate::shared::fs_atomic::create_exclusive;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct ProvisionRequest<'a> {
    pub template: Option<&'a Path>,
    pub target_root: &'a Path,
    pub count: usize,
    pub lock_name: &'a str,
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub created: Vec<PathBuf>,
    pub skipped_existing: Vec<PathBuf>,
    pub skipped_locked: Vec<PathBuf>,
}

pub fn provision_slots(request: ProvisionRequest<'_>) -> Result<ProvisionReport, WorkspaceError> {
    if let Some(template) = request.template {
        if !template.is_dir() {
            return Err(WorkspaceError::InvalidTemplate {
                path: template.display().to_string(),
            });
        }
    }
    if request.count == 0 {
        return Err(WorkspaceError::InvalidCount {
            count: request.count,
        });
    }

    let existing = list_slots(request.target_root)?;
    let mut next_number = existing.last().map(|slot| slot.number + 1).unwrap_or(1);
    let mut report = ProvisionReport::default();

    if request.force {
        for slot in existing.iter().take(request.count) {
            if !request.dry_run {
                let lock = slot.lock_path(request.lock_name);
                if lock.exists() {
                    fs::remove_file(&lock).map_err(|err| io_error(&lock, err))?;
                }
                populate_slot(slot, request.template)?;
            }
            report.created.push(slot.dir.clone());
        }
    } else {
        for slot in &existing {
            if slot.is_locked(request.lock_name) {
                report.skipped_locked.push(slot.dir.clone());
            } else if report.skipped_existing.len() < request.count {
                report.skipped_existing.push(slot.dir.clone());
            }
        }
    }

    while report.created.len() + report.skipped_existing.len() < request.count {
        let slot = WorkerSlot::new(request.target_root, next_number);
        next_number += 1;
        if !request.dry_run {
            fs::create_dir_all(&slot.dir).map_err(|err| io_error(&slot.dir, err))?;
            populate_slot(&slot, request.template)?;
        }
        report.created.push(slot.dir);
    }

    Ok(report)
}

pub fn create_next_slot(
    root: &Path,
    template: Option<&Path>,
    claim: Option<&str>,
) -> Result<WorkerSlot, WorkspaceError> {
    fs::create_dir_all(root).map_err(|err| io_error(root, err))?;
    let mut number = list_slots(root)?
        .last()
        .map(|slot| slot.number + 1)
        .unwrap_or(1);
    loop {
        let slot = WorkerSlot::new(root, number);
        match fs::create_dir(&slot.dir) {
            Ok(()) => {
                if let Some(lock_name) = claim {
                    let lock = slot.lock_path(lock_name);
                    create_exclusive(&lock, std::process::id().to_string().as_bytes())
                        .map_err(|err| io_error(&lock, err))?;
                }
                populate_slot(&slot, template)?;
                return Ok(slot);
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => number += 1,
            Err(err) => return Err(io_error(&slot.dir, err)),
        }
    }
}

fn populate_slot(slot: &WorkerSlot, template: Option<&Path>) -> Result<(), WorkspaceError> {
    if let Some(template) = template {
        copy_template_dir(template, &slot.dir, slot, true)?;
    }
    ensure_slot_layout(slot)
}

fn copy_template_dir(
    source: &Path,
    destination: &Path,
    slot: &WorkerSlot,
    top_level: bool,
) -> Result<(), WorkspaceError> {
    fs::create_dir_all(destination).map_err(|err| io_error(destination, err))?;
    let entries = fs::read_dir(source).map_err(|err| io_error(source, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| io_error(source, err))?;
        let path = entry.path();
        let name = entry.file_name();
        if path.is_dir() {
            copy_template_dir(&path, &destination.join(&name), slot, false)?;
            continue;
        }
        let target = if top_level && name.to_str() == Some(WORKSPACE_TEMPLATE_FILE) {
            slot.workspace_file()
        } else {
            destination.join(&name)
        };
        fs::copy(&path, &target).map_err(|err| io_error(&target, err))?;
    }
    Ok(())
}
