//! Integration tests for the `stow` command-line interface.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use stow_schema::{Algorithm, Integrity};
use tempfile::TempDir;

/// Test context with an isolated cache directory
struct TestContext {
    temp_dir: TempDir,
    cache_base: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let cache_base = temp_dir.path().join("cache-base");
        Self {
            temp_dir,
            cache_base,
        }
    }

    fn stow_cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_stow"));
        cmd.env("STOW_CACHE_DIR", &self.cache_base);
        cmd.env_remove("NODE_PATH");
        cmd.current_dir(self.temp_dir.path());
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.stow_cmd().args(args).output().expect("failed to run stow")
    }

    fn write_pkg(&self, root: &Path, name: &str, deps: &[&str]) {
        let deps = deps
            .iter()
            .map(|d| format!("\"{d}\": \"*\""))
            .collect::<Vec<_>>()
            .join(", ");
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            format!(r#"{{"name": "{name}", "dependencies": {{ {deps} }}}}"#),
        )
        .unwrap();
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for sub in ["integrity", "fetch", "materialize", "cache"] {
        assert!(text.contains(sub), "help should list {sub}");
    }
}

#[test]
fn test_integrity_of_local_file() {
    let ctx = TestContext::new();
    let file = ctx.temp_dir.path().join("artifact.zip");
    std::fs::write(&file, b"artifact bytes").unwrap();
    let locator = format!("file://{}", file.display());

    let output = ctx.run(&["integrity", &locator]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let expected = Integrity::compute(Algorithm::Sha512, b"artifact bytes");
    assert_eq!(stdout(&output), format!("{locator} {expected}"));
}

#[test]
fn test_fetch_local_verifies_in_place() {
    let ctx = TestContext::new();
    let file = ctx.temp_dir.path().join("artifact.zip");
    std::fs::write(&file, b"artifact bytes").unwrap();
    let locator = format!("file://{}", file.display());
    let good = Integrity::compute(Algorithm::Sha256, b"artifact bytes").to_string();
    let bad = Integrity::compute(Algorithm::Sha256, b"tampered").to_string();

    let output = ctx.run(&["fetch", &locator, "--integrity", &good]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), file.display().to_string());

    let output = ctx.run(&["fetch", &locator, "--integrity", &bad]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("error:"));
    assert!(stderr(&output).contains("Integrity check failed"));
}

#[test]
fn test_fetch_remote_uses_cache() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/dist/sdk.zip")
        .with_status(200)
        .with_body("sdk contents")
        .expect(1)
        .create();

    let ctx = TestContext::new();
    let url = format!("{}/dist/sdk.zip", server.url());
    let sri = Integrity::compute(Algorithm::Sha512, b"sdk contents").to_string();

    for _ in 0..2 {
        let output = ctx.run(&["fetch", &url, "--integrity", &sri]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(
            PathBuf::from(stdout(&output)),
            ctx.cache_base.join("stow-cache").join("sdk.zip")
        );
    }

    mock.assert();
}

#[test]
fn test_fetch_remote_requires_integrity() {
    let mut server = mockito::Server::new();
    let mock = server.mock("GET", "/sdk.zip").expect(0).create();

    let ctx = TestContext::new();
    let output = ctx.run(&["fetch", &format!("{}/sdk.zip", server.url())]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("No integrity digest"));
    mock.assert();
}

#[test]
fn test_materialize_flattens_dependencies() {
    let ctx = TestContext::new();
    let modules = ctx.temp_dir.path().join("node_modules");
    ctx.write_pkg(&modules, "app", &["lib"]);
    ctx.write_pkg(&modules, "lib", &["app"]);
    let dest = ctx.temp_dir.path().join("out");

    let output = ctx.run(&["materialize", "app", "--dest", dest.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert!(dest.join("app/package.json").is_file());
    assert!(dest.join("lib/package.json").is_file());
}

#[test]
fn test_materialize_with_search_path() {
    let ctx = TestContext::new();
    let vendor = ctx.temp_dir.path().join("vendor");
    ctx.write_pkg(&vendor, "tool", &[]);
    let dest = ctx.temp_dir.path().join("out");

    let output = ctx.run(&[
        "materialize",
        "tool",
        "--dest",
        dest.to_str().unwrap(),
        "--search-path",
        vendor.to_str().unwrap(),
        "--quiet",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dest.join("tool/package.json").is_file());
}

#[test]
fn test_materialize_missing_module_fails() {
    let ctx = TestContext::new();
    let dest = ctx.temp_dir.path().join("out");

    let output = ctx.run(&["materialize", "ghost", "--dest", dest.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("'ghost' not found"));
}

#[test]
fn test_materialize_rejects_invalid_id() {
    let ctx = TestContext::new();
    let dest = ctx.temp_dir.path().join("out");

    let output = ctx.run(&["materialize", "../escape", "--dest", dest.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid module id"));
    assert!(!dest.exists());
}

#[test]
fn test_cache_path_and_clean() {
    let ctx = TestContext::new();

    let output = ctx.run(&["cache", "path"]);
    assert!(output.status.success());
    let root = PathBuf::from(stdout(&output));
    assert_eq!(root, ctx.cache_base.join("stow-cache"));

    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("old.zip"), b"stale").unwrap();

    let output = ctx.run(&["cache", "clean"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
}

#[test]
fn test_cache_dir_flag_overrides_env() {
    let ctx = TestContext::new();
    let other = ctx.temp_dir.path().join("other");

    let output = ctx.run(&["--cache-dir", other.to_str().unwrap(), "cache", "path"]);
    assert!(output.status.success());
    assert_eq!(PathBuf::from(stdout(&output)), other.join("stow-cache"));
}
