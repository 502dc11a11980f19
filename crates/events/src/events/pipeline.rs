use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use super::FailureContext;
use formula_types::Stage;

/// Install pipeline lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Run started; the scratch directory has been created
    Started {
        run_id: Uuid,
        formula: String,
        version: String,
        scratch_dir: PathBuf,
    },

    /// A stage is about to run
    StageStarted { run_id: Uuid, stage: Stage },

    /// One unit of work inside a stage, e.g. an archive or a command line
    Step {
        run_id: Uuid,
        stage: Stage,
        detail: String,
    },

    /// A stage finished successfully
    StageCompleted {
        run_id: Uuid,
        stage: Stage,
        duration: Duration,
    },

    /// A single artifact was copied into the prefix
    ArtifactInstalled {
        run_id: Uuid,
        source: PathBuf,
        destination: PathBuf,
    },

    /// Run aborted at `stage`
    Failed {
        run_id: Uuid,
        stage: Option<Stage>,
        failure: FailureContext,
    },

    /// Every stage succeeded
    Completed {
        run_id: Uuid,
        formula: String,
        installed: Vec<PathBuf>,
        duration: Duration,
        /// Present when the scratch directory was retained
        kept_scratch: Option<PathBuf>,
    },
}
