use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn prerender(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_prerender"))
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run prerender")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn missing_build_folder_fails_with_exit_code_2() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("prerender.toml"), "routes = [\"/\", \"/about\"]\n").unwrap();

    let output = prerender(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("Build folder not found: dist"), "stderr: {err}");
    assert!(err.contains("--with-build"), "stderr: {err}");
    assert!(!dir.path().join("prerendered").exists());
}

#[test]
fn missing_build_folder_reports_json_error_document() {
    let dir = TempDir::new().unwrap();

    let output = prerender(dir.path(), &["--serve-dir", "build", "--format", "json"]);

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).expect("valid json");
    assert_eq!(value["mode"], "error");
    assert_eq!(value["error"]["category"], "build");
    assert_eq!(value["error"]["message"], "Build folder not found: build");
    assert!(value["error"]["remediation"].is_string());
}

#[test]
fn unknown_config_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("dist")).unwrap();
    std::fs::write(
        dir.path().join("prerender.json"),
        r#"{ "routes": ["/"], "outputDirectory": "out" }"#,
    )
    .unwrap();

    let output = prerender(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("Failed to parse config file"), "stderr: {err}");
    assert!(err.contains("outputDirectory"), "stderr: {err}");
}

#[test]
fn invalid_route_in_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("dist")).unwrap();
    std::fs::write(dir.path().join("prerender.yaml"), "routes:\n  - about\n").unwrap();

    let output = prerender(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Invalid config"));
}

#[test]
fn flag_overrides_are_validated_before_the_build_folder_check() {
    let dir = TempDir::new().unwrap();

    let output = prerender(dir.path(), &["--skip-selector", ""]);
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("skipPrerenderSelector must not be empty"), "stderr: {err}");

    let output = prerender(dir.path(), &["--nav-timeout", "0", "--format", "json"]);
    assert_eq!(output.status.code(), Some(2));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["error"]["category"], "config");
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("navigationTimeout must be greater than zero"));
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = TempDir::new().unwrap();

    let output = prerender(dir.path(), &["--config", "nope.toml", "--format", "json"]);

    assert_eq!(output.status.code(), Some(2));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["error"]["category"], "config");
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Config file not found"));
}

#[cfg(unix)]
#[test]
fn failing_build_command_stops_before_serving() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("prerender.toml"),
        "routes = [\"/\"]\nbuildCommand = \"exit 7\"\n",
    )
    .unwrap();

    let output = prerender(dir.path(), &["--with-build"]);

    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("Build command `exit 7` failed"), "stderr: {err}");
}

#[cfg(unix)]
#[test]
fn build_runs_before_build_folder_check() {
    let dir = TempDir::new().unwrap();
    // The build creates dist/ but the server command fails, so the run
    // still ends in a server error after the build-folder check passed.
    std::fs::write(
        dir.path().join("prerender.toml"),
        concat!(
            "routes = [\"/\"]\n",
            "buildCommand = \"mkdir dist\"\n",
            "serverCommand = \"exit 3 # {port}\"\n",
            "startPort = 5310\n",
            "portAttempts = 20\n",
        ),
    )
    .unwrap();

    let output = prerender(dir.path(), &["--with-build", "--format", "json"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(dir.path().join("dist").is_dir());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["error"]["category"], "server");
}

#[test]
fn malformed_viewport_flag_is_a_usage_error() {
    let dir = TempDir::new().unwrap();

    let output = prerender(dir.path(), &["--viewport", "wide"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--viewport"));
}

#[test]
fn help_lists_flags() {
    let dir = TempDir::new().unwrap();

    let output = prerender(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--with-build", "--flat-output", "--skip-selector", "--config"] {
        assert!(stdout.contains(flag), "missing {flag} in help");
    }
}
