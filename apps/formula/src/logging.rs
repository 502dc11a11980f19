//! Structured logging integration for events
//!
//! Every event the CLI receives is also recorded through `tracing` with
//! structured fields, so `--debug` and `RUST_LOG` see the same run history
//! the terminal shows.

use formula_events::{AppEvent, DownloadEvent, GeneralEvent, PipelineEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` at a level matching its meaning
pub fn log_event_with_tracing(event: &AppEvent) {
    match event {
        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, context } => {
                warn!(context = ?context, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(context = ?context, "{message}");
            }
        },

        AppEvent::Download(download) => match download {
            DownloadEvent::Started {
                url,
                archive,
                total_size,
            } => {
                debug!(url = %url, archive = %archive, total_size = ?total_size, "Download started");
            }
            DownloadEvent::Completed {
                url,
                archive,
                final_size,
                total_time,
            } => {
                info!(
                    url = %url,
                    archive = %archive,
                    final_size,
                    elapsed_ms = total_time.as_millis(),
                    "Download completed"
                );
            }
        },

        AppEvent::Pipeline(pipeline) => match pipeline {
            PipelineEvent::Started {
                run_id,
                formula,
                version,
                scratch_dir,
            } => {
                info!(
                    run_id = %run_id,
                    formula = %formula,
                    version = %version,
                    scratch_dir = %scratch_dir.display(),
                    "Install started"
                );
            }
            PipelineEvent::StageStarted { run_id, stage } => {
                debug!(run_id = %run_id, stage = %stage, "Stage started");
            }
            PipelineEvent::Step {
                run_id,
                stage,
                detail,
            } => {
                debug!(run_id = %run_id, stage = %stage, detail = %detail, "Stage step");
            }
            PipelineEvent::StageCompleted {
                run_id,
                stage,
                duration,
            } => {
                info!(
                    run_id = %run_id,
                    stage = %stage,
                    elapsed_ms = duration.as_millis(),
                    "Stage completed"
                );
            }
            PipelineEvent::ArtifactInstalled {
                run_id,
                source,
                destination,
            } => {
                info!(
                    run_id = %run_id,
                    source = %source.display(),
                    destination = %destination.display(),
                    "Artifact installed"
                );
            }
            PipelineEvent::Failed {
                run_id,
                stage,
                failure,
            } => {
                error!(
                    run_id = %run_id,
                    stage = ?stage,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Install failed"
                );
            }
            PipelineEvent::Completed {
                run_id,
                formula,
                installed,
                duration,
                kept_scratch,
            } => {
                info!(
                    run_id = %run_id,
                    formula = %formula,
                    artifacts = installed.len(),
                    elapsed_ms = duration.as_millis(),
                    kept_scratch = ?kept_scratch,
                    "Install completed"
                );
            }
        },
    }
}
