use super::error::DispatchError;
use super::strategy::{Dispatch, DispatchStatus, Pending};
use super::worker_process::LaunchedWorker;
use crate::shared::ids::QueryId;
use crate::shared::logging::RunLog;
use std::fs;
use std::thread;

#[derive(Debug)]
pub struct IssuedDispatch {
    pub index: usize,
    pub dispatch: Dispatch,
    pub outcome: Result<Pending, DispatchError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub query_id: QueryId,
    pub dispatch: Dispatch,
    pub result: Result<String, DispatchError>,
}

impl QueryOutcome {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    pub fn render_line(&self) -> String {
        match &self.result {
            Ok(text) => text.trim_end().to_string(),
            Err(err) => format!("Error: {err}"),
        }
    }
}

pub fn collect_group(mut issued: Vec<IssuedDispatch>, log: &RunLog) -> Vec<QueryOutcome> {
    issued.sort_by_key(|entry| entry.index);
    issued
        .into_iter()
        .map(|entry| {
            let IssuedDispatch {
                mut dispatch,
                outcome,
                ..
            } = entry;
            let result = match outcome {
                Ok(Pending::Completed(text)) => Ok(text),
                Ok(Pending::Launched(worker)) => {
                    read_worker_result(&dispatch.query_id, worker, log)
                }
                Err(err) => Err(err),
            };
            dispatch.status = if result.is_ok() {
                DispatchStatus::Succeeded
            } else {
                DispatchStatus::Failed
            };
            QueryOutcome {
                query_id: dispatch.query_id.clone(),
                dispatch,
                result,
            }
        })
        .collect()
}

fn read_worker_result(
    query: &QueryId,
    mut worker: LaunchedWorker,
    log: &RunLog,
) -> Result<String, DispatchError> {
    let read = fs::read_to_string(&worker.result_file);
    let exited = worker.exit_status();

    let result = match read {
        Ok(text) => Ok(text),
        Err(err) => {
            let reason = match exited {
                Some(status) if status.success() => {
                    format!("worker exited without writing a result ({err})")
                }
                Some(status) => format!("worker failed with {status} ({err})"),
                None => format!("worker still running ({err})"),
            };
            log.warn(
                "result.missing",
                &format!("{query} slot={} {reason}", worker.slot.name()),
            );
            Err(DispatchError::MissingResult {
                query: query.clone(),
                path: worker.result_file.display().to_string(),
                reason,
            })
        }
    };

    // A slot is only handed back once its worker process has been reaped.
    if exited.is_some() {
        if let Err(err) = worker.release() {
            log.warn("slot.release_failed", &err.to_string());
        }
    } else {
        log.warn(
            "slot.kept_locked",
            &format!("{} still has a running worker", worker.slot.dir.display()),
        );
        release_after_exit(worker, log.clone());
    }
    result
}

fn release_after_exit(worker: LaunchedWorker, log: RunLog) {
    thread::spawn(move || {
        let slot = worker.slot.dir.display().to_string();
        match worker.wait_and_release() {
            Ok(status) => {
                let status = status.map_or_else(|| "unknown".to_string(), |s| s.to_string());
                log.info("slot.released", &format!("{slot} worker exited with {status}"));
            }
            Err(err) => log.warn("slot.release_failed", &err.to_string()),
        }
    });
}
