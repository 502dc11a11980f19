//! Install stage: copy built artifacts into the prefix

use crate::plan::PlannedInstall;
use formula_errors::{Error, PipelineError};
use formula_types::ArtifactCategory;
use std::path::{Path, PathBuf};

/// Copy every artifact to its destination
///
/// All sources are checked before anything is copied, so a missing
/// artifact leaves the prefix untouched. Each file is copied byte for
/// byte to a temporary name and renamed into place.
///
/// # Errors
///
/// Returns `PipelineError::Install` if an artifact is missing or cannot be
/// copied.
pub async fn install_artifacts(installs: &[PlannedInstall]) -> Result<Vec<PathBuf>, Error> {
    for item in installs {
        let is_file = tokio::fs::metadata(&item.source)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(install_error(
                &item.source,
                format!("not found at {}", item.source.display()),
            ));
        }
    }

    let mut installed = Vec::with_capacity(installs.len());
    for item in installs {
        copy_artifact(item).await?;
        tracing::info!(
            source = %item.source.display(),
            destination = %item.destination.display(),
            "installed artifact"
        );
        installed.push(item.destination.clone());
    }
    Ok(installed)
}

async fn copy_artifact(item: &PlannedInstall) -> Result<(), Error> {
    let fail = |message: String| install_error(&item.source, message);

    let Some(dir) = item.destination.parent() else {
        return Err(fail(format!(
            "invalid destination {}",
            item.destination.display()
        )));
    };
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| fail(format!("cannot create {}: {e}", dir.display())))?;

    let mut part_name = item.destination.as_os_str().to_owned();
    part_name.push(".formula-part");
    let part = PathBuf::from(part_name);

    tokio::fs::copy(&item.source, &part)
        .await
        .map_err(|e| fail(format!("copy to {} failed: {e}", part.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = match item.category {
            ArtifactCategory::Bin => 0o755,
            ArtifactCategory::Lib => 0o644,
        };
        if let Err(e) = tokio::fs::set_permissions(&part, std::fs::Permissions::from_mode(mode)).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(fail(format!("cannot set permissions: {e}")));
        }
    }
    #[cfg(not(unix))]
    let _ = item.category;

    if let Err(e) = tokio::fs::rename(&part, &item.destination).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(fail(format!(
            "cannot move into {}: {e}",
            item.destination.display()
        )));
    }
    Ok(())
}

fn install_error(source: &Path, message: String) -> Error {
    let artifact = source
        .file_name()
        .map_or_else(|| source.display().to_string(), |n| n.to_string_lossy().into_owned());
    PipelineError::Install { artifact, message }.into()
}
