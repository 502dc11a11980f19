//! Install pipeline runner
//!
//! One run: lock the prefix, create a scratch directory, then fetch,
//! verify, unpack, configure, compile and install in that order. The first
//! failing stage aborts the run.

use crate::fetch::{fetch_archive, fetch_to, verify_archive};
use crate::formula::Formula;
use crate::install::install_artifacts;
use crate::lock::InstallLock;
use crate::plan::{build_system, InstallPlan};
use crate::scratch::ScratchDir;
use crate::settings::BuildSettings;
use crate::unpack::unpack_archive;
use formula_errors::Error;
use formula_events::{AppEvent, EventEmitter, EventSender, FailureContext, PipelineEvent};
use formula_net::NetClient;
use formula_types::Stage;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub run_id: Uuid,
    pub installed: Vec<PathBuf>,
    pub kept_scratch: Option<PathBuf>,
    pub duration: Duration,
}

/// Drives a formula through every stage
pub struct Pipeline {
    client: NetClient,
    settings: BuildSettings,
    tx: EventSender,
    command: String,
}

impl EventEmitter for Pipeline {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

/// Stage bookkeeping for one run
struct StageTracker {
    run_id: Uuid,
    current: Option<Stage>,
    started: Instant,
}

impl Pipeline {
    #[must_use]
    pub fn new(client: NetClient, settings: BuildSettings, tx: EventSender) -> Self {
        Self {
            client,
            settings,
            tx,
            command: "install".to_string(),
        }
    }

    /// Command name recorded in the lock metadata
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Run the full pipeline for `formula`
    ///
    /// # Errors
    ///
    /// Returns the lock error if another run holds the prefix, an I/O error if
    /// the scratch directory cannot be created, or the first stage failure.
    pub async fn run(&self, formula: &Formula) -> Result<InstallOutcome, Error> {
        let started = Instant::now();
        let _lock = InstallLock::acquire(&self.settings.prefix, &formula.name, &self.command)?;
        let scratch = ScratchDir::create(&self.settings.build_root, &formula.name)?;
        let plan = InstallPlan::new(formula, &self.settings, scratch.path());

        let mut tracker = StageTracker {
            run_id: Uuid::new_v4(),
            current: None,
            started: Instant::now(),
        };
        tracing::info!(
            run_id = %tracker.run_id,
            formula = %formula.name,
            version = %formula.version,
            scratch = %scratch.path().display(),
            "starting install"
        );
        self.emit(AppEvent::Pipeline(PipelineEvent::Started {
            run_id: tracker.run_id,
            formula: formula.name.clone(),
            version: formula.version.clone(),
            scratch_dir: scratch.path().to_path_buf(),
        }));

        let result = self.run_stages(formula, &plan, &mut tracker).await;
        let kept_scratch = scratch.finish(self.settings.keep_scratch, result.is_ok());
        let run_id = tracker.run_id;

        match result {
            Ok(installed) => {
                let duration = started.elapsed();
                self.emit(AppEvent::Pipeline(PipelineEvent::Completed {
                    run_id,
                    formula: formula.name.clone(),
                    installed: installed.clone(),
                    duration,
                    kept_scratch: kept_scratch.clone(),
                }));
                tracing::info!(%run_id, elapsed = ?duration, "install completed");
                Ok(InstallOutcome {
                    run_id,
                    installed,
                    kept_scratch,
                    duration,
                })
            }
            Err(err) => {
                let stage = err.stage().or(tracker.current);
                tracing::error!(%run_id, stage = ?stage, error = %err, "install failed");
                self.emit(AppEvent::Pipeline(PipelineEvent::Failed {
                    run_id,
                    stage,
                    failure: FailureContext::from_error(&err),
                }));
                if let Some(path) = kept_scratch {
                    self.emit_warning_with_context(
                        "scratch directory kept for inspection",
                        path.display().to_string(),
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        formula: &Formula,
        plan: &InstallPlan,
        tracker: &mut StageTracker,
    ) -> Result<Vec<PathBuf>, Error> {
        let downloads = plan.downloads_dir();
        tokio::fs::create_dir_all(&downloads)
            .await
            .map_err(|e| Error::io_with_path(&e, &downloads))?;

        self.begin(tracker, Stage::Fetch);
        for archive in &plan.archives {
            self.step(tracker, &archive.url);
            fetch_archive(&self.client, archive, &self.tx).await?;
        }
        self.end(tracker);

        self.begin(tracker, Stage::Integrity);
        for archive in &plan.archives {
            self.step(tracker, &format!("{} {}", archive.archive, archive.digest.algorithm()));
            verify_archive(&archive.download_path, &archive.archive, &archive.digest).await?;
        }
        self.end(tracker);

        self.begin(tracker, Stage::Unpack);
        for archive in &plan.archives {
            self.step(tracker, &archive.archive);
            unpack_archive(
                &archive.download_path,
                archive.format,
                &archive.unpack_dir,
                archive.strip_top_level,
            )
            .await?;
        }
        self.end(tracker);

        let system = build_system(formula, &self.settings);
        let ctx = plan.context(Some(self.tx.clone()));
        tracing::debug!(run_id = %tracker.run_id, build_system = system.name(), "build system selected");

        self.begin(tracker, Stage::Configure);
        self.step(tracker, &plan.configure.to_string());
        system.configure(&ctx, &plan.formula_args).await?;
        self.end(tracker);

        self.begin(tracker, Stage::Build);
        self.step(tracker, &plan.compile.to_string());
        system.build(&ctx).await?;
        self.end(tracker);

        self.begin(tracker, Stage::Install);
        let installed = install_artifacts(&plan.installs).await?;
        for (item, destination) in plan.installs.iter().zip(&installed) {
            self.emit(AppEvent::Pipeline(PipelineEvent::ArtifactInstalled {
                run_id: tracker.run_id,
                source: item.source.clone(),
                destination: destination.clone(),
            }));
        }
        self.end(tracker);

        Ok(installed)
    }

    fn begin(&self, tracker: &mut StageTracker, stage: Stage) {
        tracker.current = Some(stage);
        tracker.started = Instant::now();
        tracing::debug!(run_id = %tracker.run_id, %stage, "stage started");
        self.emit(AppEvent::Pipeline(PipelineEvent::StageStarted {
            run_id: tracker.run_id,
            stage,
        }));
    }

    fn step(&self, tracker: &StageTracker, detail: &str) {
        if let Some(stage) = tracker.current {
            self.emit(AppEvent::Pipeline(PipelineEvent::Step {
                run_id: tracker.run_id,
                stage,
                detail: detail.to_string(),
            }));
        }
    }

    fn end(&self, tracker: &StageTracker) {
        if let Some(stage) = tracker.current {
            let duration = tracker.started.elapsed();
            tracing::debug!(run_id = %tracker.run_id, %stage, elapsed = ?duration, "stage completed");
            self.emit(AppEvent::Pipeline(PipelineEvent::StageCompleted {
                run_id: tracker.run_id,
                stage,
                duration,
            }));
        }
    }
}

/// Download and verify every archive of `formula` into `output_dir`
///
/// Nothing is unpacked or built. Returns the downloaded paths, main source
/// first.
///
/// # Errors
///
/// Returns `PipelineError::Fetch` or `PipelineError::Integrity` for the first
/// archive that fails.
pub async fn fetch_only(
    client: &NetClient,
    formula: &Formula,
    output_dir: &Path,
    tx: &EventSender,
) -> Result<Vec<PathBuf>, Error> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| Error::io_with_path(&e, output_dir))?;

    let mut fetched = Vec::new();
    for spec in formula.archives() {
        let dest = output_dir.join(&spec.archive);
        fetch_to(client, &spec.url, &dest, tx).await?;
        verify_archive(&dest, &spec.archive, &spec.digest).await?;
        fetched.push(dest);
    }
    Ok(fetched)
}
