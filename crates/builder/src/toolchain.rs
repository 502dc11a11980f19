//! Compiler resolution
//!
//! The formula names a compiler family and optional major version; user
//! config may override both. The result is a pair of driver names passed
//! to CMake and exported as `CC`/`CXX`.

use crate::formula::Toolchain;
use formula_config::ToolchainConfig;
use formula_types::CompilerId;

/// Compiler drivers after applying overrides
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedToolchain {
    pub compiler_id: CompilerId,
    pub compiler_version: Option<String>,
    /// C compiler driver; `None` lets CMake detect
    pub cc: Option<String>,
    /// C++ compiler driver; `None` lets CMake detect
    pub cxx: Option<String>,
}

impl ResolvedToolchain {
    /// Merge formula and user settings
    ///
    /// A non-`auto` user compiler replaces the formula's compiler and
    /// version together. With an `auto` user compiler, a user version still
    /// overrides the formula version.
    #[must_use]
    pub fn resolve(formula: &Toolchain, user: &ToolchainConfig) -> Self {
        let user_version = user
            .compiler_version
            .clone()
            .filter(|v| !v.trim().is_empty());

        let (compiler_id, compiler_version) = if user.compiler_id == CompilerId::Auto {
            (
                formula.compiler_id,
                user_version.or_else(|| formula.compiler_version.clone()),
            )
        } else {
            (user.compiler_id, user_version)
        };

        let (cc, cxx) = match compiler_id {
            CompilerId::Auto => (None, None),
            CompilerId::Gcc => drivers("gcc", "g++", compiler_version.as_deref()),
            CompilerId::Clang => drivers("clang", "clang++", compiler_version.as_deref()),
        };

        Self {
            compiler_id,
            compiler_version: if compiler_id == CompilerId::Auto {
                None
            } else {
                compiler_version
            },
            cc,
            cxx,
        }
    }
}

fn drivers(c: &str, cxx: &str, version: Option<&str>) -> (Option<String>, Option<String>) {
    match version.map(str::trim) {
        Some(v) if !v.is_empty() => (Some(format!("{c}-{v}")), Some(format!("{cxx}-{v}"))),
        _ => (Some(c.to_string()), Some(cxx.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula(id: CompilerId, version: Option<&str>) -> Toolchain {
        Toolchain {
            compiler_id: id,
            compiler_version: version.map(String::from),
        }
    }

    fn user(id: CompilerId, version: Option<&str>) -> ToolchainConfig {
        ToolchainConfig {
            compiler_id: id,
            compiler_version: version.map(String::from),
        }
    }

    #[test]
    fn test_formula_gcc9() {
        let tc = ResolvedToolchain::resolve(
            &formula(CompilerId::Gcc, Some("9")),
            &user(CompilerId::Auto, None),
        );
        assert_eq!(tc.cc.as_deref(), Some("gcc-9"));
        assert_eq!(tc.cxx.as_deref(), Some("g++-9"));
        assert_eq!(tc.compiler_version.as_deref(), Some("9"));
    }

    #[test]
    fn test_user_compiler_replaces_formula_version() {
        let tc = ResolvedToolchain::resolve(
            &formula(CompilerId::Gcc, Some("9")),
            &user(CompilerId::Clang, None),
        );
        assert_eq!(tc.cc.as_deref(), Some("clang"));
        assert_eq!(tc.cxx.as_deref(), Some("clang++"));
        assert_eq!(tc.compiler_version, None);
    }

    #[test]
    fn test_user_version_only() {
        let tc = ResolvedToolchain::resolve(
            &formula(CompilerId::Gcc, Some("9")),
            &user(CompilerId::Auto, Some("13")),
        );
        assert_eq!(tc.cc.as_deref(), Some("gcc-13"));
    }

    #[test]
    fn test_auto_adds_nothing() {
        let tc = ResolvedToolchain::resolve(
            &formula(CompilerId::Auto, None),
            &user(CompilerId::Auto, Some("13")),
        );
        assert!(tc.cc.is_none());
        assert!(tc.cxx.is_none());
        assert_eq!(tc.compiler_version, None);
    }
}
