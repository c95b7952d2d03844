//! `PlaywrightSession` against stand-in helpers that speak the same
//! line-delimited JSON protocol as the Node capture script.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use prerender_lib::{
    CaptureBackend, CaptureOptions, CaptureSession, PlaywrightBackend, PrerenderError, Viewport,
};
use tempfile::TempDir;

// Writing an executable while another test forks can fail with ETXTBSY.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

const SERVING_HELPER: &str = r##"
echo '{"status":"ready"}'
while IFS= read -r line; do
  case "$line" in
    *'"command":"close"'*) exit 0 ;;
    *'/slow-feed'*) echo '{"status":"error","message":"page.goto: Timeout 100ms exceeded."}' ;;
    *'"removeSelector":".ad"'*) echo '{"status":"ok","html":"<html><body>no ads</body></html>"}' ;;
    *) printf '{"status":"ok","html":"<html><body>%sx%s</body></html>"}\n' "$4" "$5" ;;
  esac
done
"##;

const LAUNCH_FAILURE_HELPER: &str = r##"
echo '{"status":"error","message":"browserType.launch: Executable is missing at /ms-playwright/chromium"}' >&2
exit 1
"##;

const CRASHING_HELPER: &str = r##"
echo '{"status":"ready"}'
read -r line
echo 'renderer crashed' >&2
exit 3
"##;

/// Writes an executable `node` stand-in. `--version` and the Playwright
/// availability check (two arguments) succeed; the capture invocation runs
/// `body`.
fn fake_node(dir: &Path, body: &str) -> String {
    let path = dir.join("node");
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo v20.11.0; exit 0; fi\nif [ \"$#\" -eq 2 ]; then exit 0; fi\n{body}"
    );
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().into_owned()
}

fn backend(node_command: String, viewport: Option<Viewport>) -> PlaywrightBackend {
    PlaywrightBackend::new(CaptureOptions {
        node_command,
        viewport,
        navigation_timeout: Duration::from_secs(1),
        network_idle_timeout: Duration::from_secs(1),
        launch_timeout: Duration::from_secs(10),
        ..CaptureOptions::default()
    })
}

fn browser_message(err: PrerenderError) -> String {
    match err {
        PrerenderError::Browser(msg) => msg,
        other => panic!("expected browser error, got {other:?}"),
    }
}

#[tokio::test]
async fn session_captures_routes_and_closes_once() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let node = fake_node(dir.path(), SERVING_HELPER);

    let viewport = Viewport::new(1280, 720).unwrap();
    let mut session = backend(node, Some(viewport)).launch().await.expect("launch");

    let plain = session
        .capture("http://localhost:5050/", None)
        .await
        .expect("capture without selector");
    assert_eq!(plain, "<html><body>1280x720</body></html>");

    let stripped = session
        .capture("http://localhost:5050/pricing", Some(".ad"))
        .await
        .expect("capture with selector");
    assert_eq!(stripped, "<html><body>no ads</body></html>");

    // A selector the page does not use changes nothing.
    let unmatched = session
        .capture("http://localhost:5050/", Some("[data-never]"))
        .await
        .expect("capture with unmatched selector");
    assert_eq!(unmatched, plain);

    let err = session
        .capture("http://localhost:5050/slow-feed", None)
        .await
        .unwrap_err();
    let msg = browser_message(err);
    assert!(msg.contains("Timeout 100ms exceeded"), "got: {msg}");
    assert!(msg.contains("--nav-timeout"), "got: {msg}");

    // The page survives a failed route.
    let after = session.capture("http://localhost:5050/", None).await;
    assert!(after.is_ok());

    let started = Instant::now();
    session.close().await;
    session.close().await;
    assert!(started.elapsed() < Duration::from_secs(5));

    let closed = session.capture("http://localhost:5050/", None).await;
    assert!(browser_message(closed.unwrap_err()).contains("closed"));
}

#[tokio::test]
async fn launch_failure_surfaces_helper_error() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let node = fake_node(dir.path(), LAUNCH_FAILURE_HELPER);

    let err = backend(node, None).launch().await.unwrap_err();
    let msg = browser_message(err);
    assert!(msg.contains("Executable is missing"), "got: {msg}");
}

#[tokio::test]
async fn helper_exit_mid_run_reports_stderr() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let node = fake_node(dir.path(), CRASHING_HELPER);

    let mut session = backend(node, None).launch().await.expect("launch");
    let err = session
        .capture("http://localhost:5050/", None)
        .await
        .unwrap_err();
    let msg = browser_message(err);
    assert!(msg.contains("renderer crashed"), "got: {msg}");

    session.close().await;
}
