//! Integration tests for config

#[cfg(test)]
mod tests {
    use formula_config::*;
    use formula_types::{ColorChoice, CompilerId, KeepScratch};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 4] = [
        "FORMULA_PREFIX",
        "FORMULA_JOBS",
        "FORMULA_COMPILER",
        "FORMULA_KEEP_SCRATCH",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_full_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
color = "never"

[paths]
prefix = "/opt/wsi"
build_root = "/var/tmp/formula"

[build]
jobs = 6
keep_scratch = "on_failure"
source_date_epoch = 1

[toolchain]
compiler_id = "gcc"
compiler_version = "9"

[tools]
cmake = "/usr/bin/cmake"

[network]
timeout = 60
connect_timeout = 5
"#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.paths.prefix, PathBuf::from("/opt/wsi"));
        assert_eq!(config.build_root(), PathBuf::from("/var/tmp/formula"));
        assert_eq!(config.build.jobs, 6);
        assert_eq!(config.build.keep_scratch, KeepScratch::OnFailure);
        assert_eq!(config.build.source_date_epoch, 1);
        assert_eq!(config.toolchain.compiler_id, CompilerId::Gcc);
        assert_eq!(config.toolchain.compiler_version.as_deref(), Some("9"));
        assert_eq!(config.tools.cmake, PathBuf::from("/usr/bin/cmake"));
        assert_eq!(config.network.timeout, 60);
        config.validate().unwrap();
    }

    #[tokio::test]
    async fn test_env_overrides_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[paths]\nprefix = \"/opt/file\"\n\n[build]\njobs = 2").unwrap();
        let mut config = Config::load_or_default(Some(temp_file.path()))
            .await
            .unwrap();

        {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            clear_env();
            std::env::set_var("FORMULA_PREFIX", "/opt/env");
            std::env::set_var("FORMULA_COMPILER", "clang");
            std::env::set_var("FORMULA_KEEP_SCRATCH", "always");

            config.merge_env().unwrap();
            clear_env();
        }

        assert_eq!(config.paths.prefix, PathBuf::from("/opt/env"));
        assert_eq!(config.build.jobs, 2);
        assert_eq!(config.toolchain.compiler_id, CompilerId::Clang);
        assert_eq!(config.build.keep_scratch, KeepScratch::Always);
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("FORMULA_JOBS", "many");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(result.is_err());

        clear_env();
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_an_error() {
        let result = Config::load_or_default(Some(std::path::Path::new(
            "/nonexistent/formula/config.toml",
        )))
        .await;
        assert!(result.is_err());
    }
}
