//! YAML formula parser with validation
//!
//! Validation runs before any network or filesystem action. Empty
//! required fields are always an error: a formula with a blank version,
//! URL or checksum is a template, not something that can be installed.

use super::model::{Checksum, FormulaFile, Resource};
use super::placeholders::{referenced_names, PLACEHOLDERS};
use super::{FetchSpec, Formula, UnpackTarget};
use formula_errors::{Error, RecipeError};
use formula_hash::{Digest, DigestAlgorithm};
use formula_types::{ArchiveFormat, CompilerId};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Parse and validate a formula from a file
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The YAML is invalid
/// - Required fields are empty
/// - Validation fails
pub async fn parse_formula_file(path: &Path) -> Result<Formula, Error> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RecipeError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    parse_formula_str(&content)
}

/// Parse and validate a formula from a string
///
/// # Errors
///
/// Returns an error if the YAML is invalid or validation fails.
pub fn parse_formula_str(content: &str) -> Result<Formula, Error> {
    let file: FormulaFile = serde_yml::from_str(content).map_err(|e| RecipeError::Parse {
        message: e.to_string(),
    })?;

    validate(file)
}

/// Validate a raw formula and convert it into its typed form
///
/// # Errors
///
/// Returns the first validation failure found.
pub fn validate(file: FormulaFile) -> Result<Formula, Error> {
    let FormulaFile {
        metadata,
        dependencies,
        resources,
        toolchain,
        build,
        install,
    } = file;

    require("metadata.name", &metadata.name)?;
    if !metadata
        .name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'))
    {
        return Err(invalid(
            "metadata.name",
            "only ASCII letters, digits, '-', '_', '.' and '+' are allowed",
        ));
    }
    require("metadata.version", &metadata.version)?;
    require("metadata.url", &metadata.url)?;

    let source = FetchSpec {
        archive: archive_for("metadata.url", &metadata.url, None)?,
        format: format_for(&metadata.url, None, None)?,
        digest: digest_for("metadata.checksum", metadata.checksum.as_ref())?,
        url: metadata.url.trim().to_string(),
        target: UnpackTarget::Source,
    };

    let mut archives = HashSet::new();
    archives.insert(source.archive.clone());

    let mut resource_specs = Vec::with_capacity(resources.len());
    for (index, resource) in resources.iter().enumerate() {
        let spec = resource_spec(index, resource)?;
        if !archives.insert(spec.archive.clone()) {
            return Err(RecipeError::DuplicateArchive {
                archive: spec.archive,
            }
            .into());
        }
        resource_specs.push(spec);
    }

    for (index, dep) in dependencies.iter().enumerate() {
        require(&format!("dependencies[{index}].name"), &dep.name)?;
    }

    if toolchain.compiler_id == CompilerId::Auto && toolchain.compiler_version.is_some() {
        return Err(invalid(
            "toolchain.compiler_version",
            "a version needs an explicit compiler_id",
        ));
    }

    require("build.directory", &build.directory)?;
    relative_path("build.directory", &build.directory)?;
    for (index, arg) in build.args.iter().enumerate() {
        for name in referenced_names(arg) {
            if !PLACEHOLDERS.contains(&name) {
                return Err(invalid(
                    &format!("build.args[{index}]"),
                    &format!("unknown placeholder ${{{name}}}"),
                ));
            }
        }
    }

    if install.is_empty() {
        return Err(RecipeError::EmptyField {
            field: "install".to_string(),
        }
        .into());
    }
    let mut destinations = HashSet::new();
    for (index, artifact) in install.iter().enumerate() {
        let field = format!("install[{index}].path");
        require(&field, &artifact.path)?;
        let path = relative_path(&field, &artifact.path)?;
        let Some(file_name) = path.file_name() else {
            return Err(invalid(&field, "must name a file"));
        };
        if !destinations.insert((artifact.category, file_name.to_os_string())) {
            return Err(invalid(
                &field,
                "another artifact installs to the same destination",
            ));
        }
    }

    Ok(Formula {
        name: metadata.name,
        description: metadata.description,
        version: metadata.version,
        homepage: metadata.homepage,
        dependencies,
        source,
        resources: resource_specs,
        toolchain,
        build,
        install,
    })
}

fn resource_spec(index: usize, resource: &Resource) -> Result<FetchSpec, Error> {
    let url_field = format!("resources[{index}].url");
    require(&url_field, &resource.url)?;

    let archive = archive_for(&url_field, &resource.url, resource.archive.as_deref())?;
    let format = format_for(&resource.url, Some(&archive), resource.format)?;
    let digest = digest_for(&format!("resources[{index}].checksum"), resource.checksum.as_ref())?;

    let subdir = match resource.extract_to.as_deref() {
        Some(dir) if !dir.trim().is_empty() => {
            Some(relative_path(&format!("resources[{index}].extract_to"), dir)?)
        }
        _ => None,
    };

    Ok(FetchSpec {
        url: resource.url.trim().to_string(),
        archive,
        format,
        digest,
        target: UnpackTarget::BuildDir(subdir),
    })
}

fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(RecipeError::EmptyField {
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> Error {
    RecipeError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Explicit archive name, or one derived from the URL
fn archive_for(field: &str, url: &str, explicit: Option<&str>) -> Result<String, Error> {
    formula_net::parse_url(url.trim()).map_err(|e| invalid(field, &e.to_string()))?;

    match explicit.map(str::trim) {
        Some(name) if !name.is_empty() => {
            if name == "." || name == ".." || name.contains(['/', '\\']) {
                return Err(invalid(field, &format!("archive name '{name}' is not a plain file name")));
            }
            Ok(name.to_string())
        }
        _ => archive_name_from_url(url.trim())
            .ok_or_else(|| invalid(field, "URL has no file name; set `archive` explicitly")),
    }
}

fn format_for(
    url: &str,
    archive: Option<&str>,
    explicit: Option<ArchiveFormat>,
) -> Result<ArchiveFormat, Error> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    let name = archive
        .map(str::to_string)
        .or_else(|| archive_name_from_url(url.trim()))
        .unwrap_or_default();
    ArchiveFormat::from_file_name(&name)
        .ok_or_else(|| RecipeError::UnknownArchiveFormat { archive: name }.into())
}

fn digest_for(field: &str, checksum: Option<&Checksum>) -> Result<Digest, Error> {
    fn present(value: Option<&String>) -> Option<&str> {
        value.map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    let sha256 = present(checksum.and_then(|c| c.sha256.as_ref()));
    let blake3 = present(checksum.and_then(|c| c.blake3.as_ref()));

    let (algorithm, hex) = match (sha256, blake3) {
        (Some(hex), None) => (DigestAlgorithm::Sha256, hex),
        (None, Some(hex)) => (DigestAlgorithm::Blake3, hex),
        (None, None) => {
            return Err(RecipeError::EmptyField {
                field: field.to_string(),
            }
            .into())
        }
        (Some(_), Some(_)) => return Err(invalid(field, "set exactly one of sha256 or blake3")),
    };

    Digest::from_hex(algorithm, hex).map_err(|e| invalid(field, &e.to_string()))
}

/// Reject absolute paths and parent-directory components
fn relative_path(field: &str, value: &str) -> Result<PathBuf, Error> {
    let path = PathBuf::from(value.trim());
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(invalid(field, "must be a relative path without '..'"));
    }
    Ok(path)
}

/// Derive a local file name from the last URL path segment
///
/// Query strings and fragments are dropped and characters outside
/// `[A-Za-z0-9._-]` become `_`. Returns `None` when nothing usable is left.
#[must_use]
pub fn archive_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let without_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    // Host only, no path
    let (_, path) = without_scheme.split_once('/')?;
    let segment = path.rsplit('/').next().unwrap_or(path);

    let sanitized: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        None
    } else {
        Some(sanitized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn formula_yaml(version: &str, url: &str, sha: &str) -> String {
        format!(
            r#"
metadata:
  name: wsi2dcm
  description: Conversion tool
  version: "{version}"
  homepage: https://example.org
  url: "{url}"
  checksum: {{ sha256: "{sha}" }}
dependencies:
  - {{ name: cmake, stage: build, probe: cmake }}
  - {{ name: openslide }}
resources:
  - url: https://dicom.offis.de/download/dcmtk/dcmtk362/dcmtk-3.6.2.zip
    checksum: {{ sha256: "{SHA}" }}
  - url: https://example.org/boost_1_69_0.tar.gz
    checksum: {{ blake3: "{SHA}" }}
    extract_to: deps
toolchain:
  compiler_id: gcc
  compiler_version: 9
build:
  directory: wsi-build
  jobs: 6
  args: ["-Dpkg_config_libdir=${{LIB}}"]
install:
  - {{ path: wsi2dcm, category: bin }}
  - {{ path: libwsi2dcm.dylib, category: lib }}
"#
        )
    }

    #[test]
    fn test_parse_complete_formula() {
        let formula =
            parse_formula_str(&formula_yaml("1.0.3", "https://example.org/wsi2dcm-1.0.3.tar.gz", SHA))
                .unwrap();

        assert_eq!(formula.name, "wsi2dcm");
        assert_eq!(formula.source.archive, "wsi2dcm-1.0.3.tar.gz");
        assert_eq!(formula.source.format, ArchiveFormat::TarGz);
        assert_eq!(formula.source.target, UnpackTarget::Source);
        assert_eq!(formula.toolchain.compiler_version.as_deref(), Some("9"));
        assert_eq!(formula.build.jobs, 6);

        let archives: Vec<_> = formula.archives().map(|a| a.archive.as_str()).collect();
        assert_eq!(
            archives,
            ["wsi2dcm-1.0.3.tar.gz", "dcmtk-3.6.2.zip", "boost_1_69_0.tar.gz"]
        );
        assert_eq!(formula.resources[0].format, ArchiveFormat::Zip);
        assert_eq!(formula.resources[0].target, UnpackTarget::BuildDir(None));
        assert_eq!(
            formula.resources[1].target,
            UnpackTarget::BuildDir(Some(PathBuf::from("deps")))
        );
        assert_eq!(
            formula.resources[1].digest.algorithm(),
            DigestAlgorithm::Blake3
        );
    }

    #[test]
    fn test_empty_required_fields_rejected() {
        let url = "https://example.org/wsi2dcm.tar.gz";
        for (yaml, field) in [
            (formula_yaml("", url, SHA), "metadata.version"),
            (formula_yaml("1.0", "", SHA), "metadata.url"),
            (formula_yaml("1.0", url, ""), "metadata.checksum"),
        ] {
            match parse_formula_str(&yaml) {
                Err(Error::Recipe(RecipeError::EmptyField { field: f })) => assert_eq!(f, field),
                other => panic!("expected EmptyField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_resource_url_rejected() {
        let yaml = formula_yaml("1.0", "https://example.org/a.tar.gz", SHA).replace(
            "https://dicom.offis.de/download/dcmtk/dcmtk362/dcmtk-3.6.2.zip",
            "",
        );
        assert!(matches!(
            parse_formula_str(&yaml),
            Err(Error::Recipe(RecipeError::EmptyField { field })) if field == "resources[0].url"
        ));
    }

    #[test]
    fn test_bad_checksum_hex() {
        let yaml = formula_yaml("1.0", "https://example.org/a.tar.gz", "not-hex");
        assert!(matches!(
            parse_formula_str(&yaml),
            Err(Error::Recipe(RecipeError::InvalidField { .. }))
        ));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let yaml = formula_yaml("1.0", "https://example.org/a.tar.gz", SHA)
            .replace("${LIB}", "${LIBDIR}");
        assert!(matches!(
            parse_formula_str(&yaml),
            Err(Error::Recipe(RecipeError::InvalidField { field, .. })) if field == "build.args[0]"
        ));
    }

    #[test]
    fn test_duplicate_archive_rejected() {
        let yaml = formula_yaml("1.0", "https://example.org/dcmtk-3.6.2.zip", SHA);
        assert!(matches!(
            parse_formula_str(&yaml),
            Err(Error::Recipe(RecipeError::DuplicateArchive { archive })) if archive == "dcmtk-3.6.2.zip"
        ));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let yaml = formula_yaml("1.0", "https://example.org/source.tar.xz", SHA);
        assert!(matches!(
            parse_formula_str(&yaml),
            Err(Error::Recipe(RecipeError::UnknownArchiveFormat { .. }))
        ));
    }

    #[test]
    fn test_install_path_escape_rejected() {
        let yaml = formula_yaml("1.0", "https://example.org/a.tar.gz", SHA)
            .replace("path: wsi2dcm,", "path: ../wsi2dcm,");
        assert!(matches!(
            parse_formula_str(&yaml),
            Err(Error::Recipe(RecipeError::InvalidField { .. }))
        ));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let yaml = formula_yaml("1.0", "https://example.org/a.tar.gz", SHA)
            .replace("homepage:", "home_page:");
        assert!(matches!(
            parse_formula_str(&yaml),
            Err(Error::Recipe(RecipeError::Parse { .. }))
        ));
    }

    #[test]
    fn test_archive_name_from_url() {
        assert_eq!(
            archive_name_from_url("https://github.com/open-source-parsers/jsoncpp/archive/0.10.7.zip")
                .as_deref(),
            Some("0.10.7.zip")
        );
        assert_eq!(
            archive_name_from_url("https://example.com/file.tar.gz?token=abc").as_deref(),
            Some("file.tar.gz")
        );
        assert_eq!(
            archive_name_from_url("https://example.com/file name.zip").as_deref(),
            Some("file_name.zip")
        );
        assert_eq!(archive_name_from_url("https://example.com/"), None);
        assert_eq!(archive_name_from_url("https://example.com"), None);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = parse_formula_file(Path::new("/nonexistent/formula.yml"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Recipe(RecipeError::Read { .. })));
    }

    proptest::proptest! {
        #[test]
        fn prop_archive_name_is_a_plain_file_name(url in "https?://[a-z.]{1,12}/[ -~]{0,40}") {
            if let Some(name) = archive_name_from_url(&url) {
                proptest::prop_assert!(!name.is_empty());
                proptest::prop_assert!(name != "." && name != "..");
                proptest::prop_assert!(name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
            }
        }
    }
}
