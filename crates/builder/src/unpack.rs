//! Archive extraction
//!
//! The declared format is checked against the file's magic bytes before
//! anything is written. Blocking archive work runs on `spawn_blocking`.
//! Every write is confined to the target directory, including writes that
//! would pass through links created by earlier entries.

use formula_errors::{Error, PipelineError};
use formula_types::ArchiveFormat;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::EntryType;

/// Extract `path` into `dest`
///
/// With `strip_top_level`, an archive whose entries all live under one
/// directory has that directory removed; other layouts are extracted as-is.
///
/// # Errors
///
/// Returns `PipelineError::Unpack` if the content does not match `format`,
/// the archive is corrupt, or an entry would escape `dest`.
pub async fn unpack_archive(
    path: &Path,
    format: ArchiveFormat,
    dest: &Path,
    strip_top_level: bool,
) -> Result<(), Error> {
    let archive = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let fail = |message: String| -> Error {
        PipelineError::Unpack {
            archive: archive.clone(),
            message,
        }
        .into()
    };

    check_magic(path, format).map_err(fail)?;

    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| fail(format!("cannot create {}: {e}", dest.display())))?;
    let root = tokio::fs::canonicalize(dest)
        .await
        .map_err(|e| fail(format!("cannot resolve {}: {e}", dest.display())))?;

    match format {
        ArchiveFormat::Zip => {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || extract_zip(&path, &root, strip_top_level))
                .await
                .map_err(|e| fail(format!("task join error: {e}")))?
                .map_err(fail)?;
        }
        ArchiveFormat::TarGz => {
            extract_tar_gz(path, &root, strip_top_level)
                .await
                .map_err(fail)?;
        }
    }

    tracing::debug!(archive = %archive, dest = %dest.display(), "unpacked");
    Ok(())
}

fn check_magic(path: &Path, format: ArchiveFormat) -> Result<(), String> {
    let mut header = [0u8; 4];
    let mut file = File::open(path).map_err(|e| format!("cannot open archive: {e}"))?;
    let mut read = 0;
    while read < header.len() {
        match file.read(&mut header[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) => return Err(format!("cannot read archive: {e}")),
        }
    }

    if format.matches_magic(&header[..read]) {
        Ok(())
    } else {
        Err(format!("content is not a {format} archive"))
    }
}

/// Path of an entry below `dest`, or `None` when it should be skipped
///
/// Errors on absolute paths and `..` components.
fn entry_destination(
    dest: &Path,
    entry: &Path,
    strip: bool,
) -> Result<Option<PathBuf>, String> {
    let mut parts = Vec::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            _ => return Err(format!("entry {} escapes the target directory", entry.display())),
        }
    }

    let parts = if strip { parts.get(1..).unwrap_or(&[]) } else { &parts[..] };
    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(parts.iter().fold(dest.to_path_buf(), |acc, p| acc.join(p))))
}

/// Create the parent directories of `outpath` inside `root`
///
/// The deepest existing ancestor is resolved first, so a symlink left by an
/// earlier entry cannot redirect the write. A symlink already sitting at
/// `outpath` is removed rather than written through.
fn prepare_destination(root: &Path, outpath: &Path) -> Result<(), String> {
    let Some(parent) = outpath.parent() else {
        return Ok(());
    };

    let mut existing = parent;
    while std::fs::symlink_metadata(existing).is_err() {
        match existing.parent() {
            Some(up) => existing = up,
            None => break,
        }
    }
    let resolved = existing
        .canonicalize()
        .map_err(|e| format!("cannot resolve {}: {e}", existing.display()))?;
    if !resolved.starts_with(root) {
        return Err(format!(
            "{} resolves outside the target directory",
            outpath.display()
        ));
    }

    std::fs::create_dir_all(parent)
        .map_err(|e| format!("failed to create parent directory: {e}"))?;

    if let Ok(meta) = std::fs::symlink_metadata(outpath) {
        if meta.file_type().is_symlink() {
            std::fs::remove_file(outpath)
                .map_err(|e| format!("failed to replace {}: {e}", outpath.display()))?;
        }
    }
    Ok(())
}

/// Refuse a symlink at `outpath` whose target leaves `root`
fn check_symlink_target(root: &Path, outpath: &Path, target: &Path) -> Result<(), String> {
    let escapes = || {
        format!(
            "link {} -> {} escapes the target directory",
            outpath.display(),
            target.display()
        )
    };

    let base = outpath
        .parent()
        .map_or_else(|| Ok(root.to_path_buf()), Path::canonicalize)
        .map_err(|e| format!("cannot resolve {}: {e}", outpath.display()))?;

    let mut resolved = base;
    for component in target.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(escapes());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escapes()),
        }
    }

    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(escapes())
    }
}

/// Tar headers that describe the next entry rather than a file
fn is_metadata_entry(kind: EntryType) -> bool {
    kind.is_pax_global_extensions()
        || kind.is_pax_local_extensions()
        || kind.is_gnu_longname()
        || kind.is_gnu_longlink()
}

/// True when every entry sits under one top-level directory
fn single_top_level(entries: impl Iterator<Item = (PathBuf, bool)>) -> bool {
    let mut top_level = HashSet::new();
    for (path, is_dir) in entries {
        let mut components = path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)));
        let Some(first) = components.next() else {
            continue;
        };
        // A file at the root means there is nothing to strip
        if components.next().is_none() && !is_dir {
            return false;
        }
        top_level.insert(first.as_os_str().to_os_string());
    }
    top_level.len() == 1
}

fn extract_zip(path: &Path, root: &Path, strip_top_level: bool) -> Result<(), String> {
    use zip::ZipArchive;

    let file = File::open(path).map_err(|e| format!("failed to open zip archive: {e}"))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| format!("failed to read zip archive: {e}"))?;

    let strip = strip_top_level && {
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| format!("failed to read zip entry: {e}"))?;
            names.push((PathBuf::from(entry.name()), entry.is_dir()));
        }
        single_top_level(names.into_iter())
    };

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| format!("failed to read zip entry: {e}"))?;

        let Some(name) = entry.enclosed_name() else {
            return Err(format!("entry {} escapes the target directory", entry.name()));
        };
        let Some(outpath) = entry_destination(root, &name, strip)? else {
            continue;
        };
        prepare_destination(root, &outpath)?;

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)
                .map_err(|e| format!("failed to create directory: {e}"))?;
            continue;
        }

        let mut outfile =
            File::create(&outpath).map_err(|e| format!("failed to create file: {e}"))?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|e| format!("failed to extract {}: {e}", name.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode & 0o7777))
                    .map_err(|e| format!("failed to set permissions: {e}"))?;
            }
        }
    }

    Ok(())
}

/// Decompress to a temporary tar, then extract it
async fn extract_tar_gz(path: &Path, root: &Path, strip_top_level: bool) -> Result<(), String> {
    use async_compression::tokio::bufread::GzipDecoder;
    use tokio::io::{AsyncWriteExt, BufReader};

    let temp_dir = tempfile::tempdir().map_err(|e| format!("failed to create temp directory: {e}"))?;
    let tar_path = temp_dir.path().join("archive.tar");

    {
        let input = tokio::fs::File::open(path)
            .await
            .map_err(|e| format!("failed to open archive: {e}"))?;
        let mut output = tokio::fs::File::create(&tar_path)
            .await
            .map_err(|e| format!("failed to create temp file: {e}"))?;

        let mut decoder = GzipDecoder::new(BufReader::new(input));
        tokio::io::copy(&mut decoder, &mut output)
            .await
            .map_err(|e| format!("failed to decompress gzip archive: {e}"))?;
        output
            .flush()
            .await
            .map_err(|e| format!("failed to flush temp file: {e}"))?;
    }

    let root = root.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let strip = strip_top_level && {
            let mut names = Vec::new();
            let mut archive = tar::Archive::new(open_tar(&tar_path)?);
            for entry in archive.entries().map_err(|e| format!("failed to read tar: {e}"))? {
                let entry = entry.map_err(|e| format!("failed to read tar entry: {e}"))?;
                let kind = entry.header().entry_type();
                if is_metadata_entry(kind) {
                    continue;
                }
                let path = entry
                    .path()
                    .map_err(|e| format!("invalid tar entry path: {e}"))?
                    .into_owned();
                names.push((path, kind.is_dir()));
            }
            single_top_level(names.into_iter())
        };

        let mut archive = tar::Archive::new(open_tar(&tar_path)?);
        for entry in archive.entries().map_err(|e| format!("failed to read tar: {e}"))? {
            let mut entry = entry.map_err(|e| format!("failed to read tar entry: {e}"))?;
            let kind = entry.header().entry_type();
            if is_metadata_entry(kind) {
                continue;
            }
            let entry_path = entry
                .path()
                .map_err(|e| format!("invalid tar entry path: {e}"))?
                .into_owned();
            let Some(outpath) = entry_destination(&root, &entry_path, strip)? else {
                continue;
            };
            prepare_destination(&root, &outpath)?;

            if kind.is_hard_link() {
                extract_hard_link(&root, &entry, &entry_path, &outpath, strip)?;
                continue;
            }
            if kind.is_symlink() {
                let target = entry
                    .link_name()
                    .map_err(|e| format!("invalid link target: {e}"))?
                    .ok_or_else(|| format!("link {} has no target", entry_path.display()))?;
                check_symlink_target(&root, &outpath, &target)?;
            }

            entry
                .unpack(&outpath)
                .map_err(|e| format!("failed to extract {}: {e}", entry_path.display()))?;
        }
        Ok::<(), String>(())
    })
    .await
    .map_err(|e| format!("task join error: {e}"))?;

    // temp_dir is removed here
    drop(temp_dir);
    result
}

/// Hard link targets name another entry of the same archive
fn extract_hard_link<R: Read>(
    root: &Path,
    entry: &tar::Entry<'_, R>,
    entry_path: &Path,
    outpath: &Path,
    strip: bool,
) -> Result<(), String> {
    let target = entry
        .link_name()
        .map_err(|e| format!("invalid link target: {e}"))?
        .ok_or_else(|| format!("link {} has no target", entry_path.display()))?;
    let source = entry_destination(root, &target, strip)?
        .ok_or_else(|| format!("link {} has no target", entry_path.display()))?;
    let resolved = source
        .canonicalize()
        .map_err(|e| format!("link target {} is missing: {e}", target.display()))?;
    if !resolved.starts_with(root) {
        return Err(format!(
            "link {} -> {} escapes the target directory",
            entry_path.display(),
            target.display()
        ));
    }

    if std::fs::symlink_metadata(outpath).is_ok() {
        std::fs::remove_file(outpath)
            .map_err(|e| format!("failed to replace {}: {e}", outpath.display()))?;
    }
    std::fs::hard_link(&resolved, outpath)
        .map_err(|e| format!("failed to extract {}: {e}", entry_path.display()))
}

fn open_tar(path: &Path) -> Result<File, String> {
    File::open(path).map_err(|e| format!("failed to open decompressed tar: {e}"))
}
