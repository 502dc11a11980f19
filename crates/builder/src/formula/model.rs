//! Formula file data model
//!
//! These types mirror the YAML document one to one. They are only ever
//! handed out after `parser::validate` has accepted them; the validated,
//! typed view lives in [`super::Formula`].

use formula_types::{ArchiveFormat, ArtifactCategory, CompilerId, DependencyStage};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw formula document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormulaFile {
    pub metadata: Metadata,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    #[serde(default)]
    pub resources: Vec<Resource>,

    #[serde(default)]
    pub toolchain: Toolchain,

    pub build: Build,

    #[serde(default)]
    pub install: Vec<InstallArtifact>,
}

/// Package metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub name: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub description: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub version: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub homepage: String,

    /// Main source archive
    #[serde(default, deserialize_with = "string_or_number")]
    pub url: String,

    #[serde(default)]
    pub checksum: Option<Checksum>,
}

/// Expected digest of an archive; exactly one algorithm must be set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checksum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blake3: Option<String>,
}

/// A named prerequisite
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
    pub name: String,

    #[serde(default)]
    pub stage: DependencyStage,

    /// Executable looked up on PATH by `formula deps`
    #[serde(default)]
    pub probe: Option<String>,
}

/// Additional archive fetched alongside the main source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resource {
    #[serde(default, deserialize_with = "string_or_number")]
    pub url: String,

    /// Local file name; derived from the URL when absent
    #[serde(default)]
    pub archive: Option<String>,

    /// Inferred from the archive name when absent
    #[serde(default)]
    pub format: Option<ArchiveFormat>,

    #[serde(default)]
    pub checksum: Option<Checksum>,

    /// Directory, relative to the build directory, to unpack into
    #[serde(default)]
    pub extract_to: Option<String>,
}

/// Compiler selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Toolchain {
    #[serde(default)]
    pub compiler_id: CompilerId,

    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub compiler_version: Option<String>,
}

/// Supported build-plan generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystemKind {
    #[default]
    Cmake,
}

/// Configure and compile settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Build {
    #[serde(default)]
    pub system: BuildSystemKind,

    /// Out-of-source build directory, relative to the unpacked main source
    #[serde(default = "default_build_directory")]
    pub directory: String,

    /// Compiler parallelism; 0 means auto
    #[serde(default)]
    pub jobs: usize,

    /// Configure arguments; may use `${VAR}` placeholders
    #[serde(default)]
    pub args: Vec<String>,
}

/// A file produced by the build that gets copied into the prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallArtifact {
    /// Path relative to the build directory
    pub path: String,
    pub category: ArtifactCategory,
}

fn default_build_directory() -> String {
    "build".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

/// YAML turns `version: 9` into an integer and a blank `url:` into null;
/// accept both as text so blank fields reach validation
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string_or_number(deserializer)?.unwrap_or_default())
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}
