//! Integration tests for the formula CLI

use std::path::Path;
use std::process::Command;

fn formula_cmd(config_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_formula"));
    // Keep the user's config and environment out of the run
    cmd.env("XDG_CONFIG_HOME", config_dir)
        .env("HOME", config_dir)
        .env_remove("FORMULA_PREFIX")
        .env_remove("FORMULA_JOBS")
        .env_remove("FORMULA_COMPILER")
        .env_remove("FORMULA_KEEP_SCRATCH");
    cmd
}

const VALID: &str = r#"
metadata:
  name: demo
  version: "1.0"
  url: https://example.org/demo-1.0.tar.gz
  checksum: { sha256: "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9" }
build:
  args: ["-DDEMO_LIB=${LIB}"]
install:
  - { path: demo, category: bin }
"#;

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = formula_cmd(dir.path())
        .arg("--help")
        .output()
        .expect("Failed to execute formula");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["install", "fetch", "check", "deps", "digest"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_digest_prints_hex() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("hello.txt");
    std::fs::write(&file, b"hello world").unwrap();

    let output = formula_cmd(dir.path())
        .args(["--color", "never", "digest"])
        .arg(&file)
        .output()
        .expect("Failed to execute formula");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout
        .starts_with("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9  "));
}

#[test]
fn test_check_prints_plan() {
    let dir = tempfile::tempdir().unwrap();
    let formula = dir.path().join("demo.yml");
    std::fs::write(&formula, VALID).unwrap();

    let output = formula_cmd(dir.path())
        .args(["--color", "never", "check"])
        .arg(&formula)
        .output()
        .expect("Failed to execute formula");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("demo 1.0"));
    assert!(stdout.contains("-DDEMO_LIB=/usr/local/lib"));
    assert!(stdout.contains("/usr/local/bin/demo"));
}

#[test]
fn test_check_json() {
    let dir = tempfile::tempdir().unwrap();
    let formula = dir.path().join("demo.yml");
    std::fs::write(&formula, VALID).unwrap();

    let output = formula_cmd(dir.path())
        .args(["--json", "check"])
        .arg(&formula)
        .output()
        .expect("Failed to execute formula");

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["formula"], "demo");
    assert_eq!(plan["archives"][0]["archive"], "demo-1.0.tar.gz");
}

#[test]
fn test_invalid_formula_exits_with_validation_code() {
    let dir = tempfile::tempdir().unwrap();
    let formula = dir.path().join("broken.yml");
    std::fs::write(&formula, VALID.replace("version: \"1.0\"", "version: \"\"")).unwrap();

    let output = formula_cmd(dir.path())
        .arg("check")
        .arg(&formula)
        .output()
        .expect("Failed to execute formula");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("metadata.version"));
}

#[test]
fn test_shipped_formula_needs_pins() {
    let dir = tempfile::tempdir().unwrap();
    let shipped = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../formulas/wsi2dcm.yml");

    let output = formula_cmd(dir.path())
        .arg("check")
        .arg(&shipped)
        .output()
        .expect("Failed to execute formula");

    assert_eq!(output.status.code(), Some(2));
}
