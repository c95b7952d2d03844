//! A single headless browser and page, driven through the Playwright helper.

use crate::process::{detach_group, signal_tree, terminate_tree, Termination};
use crate::{PrerenderError, Result, Viewport};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::playwright::{
    ensure_node_available, ensure_playwright_available, map_playwright_error,
    map_playwright_status_error, map_spawn_error, HelperRequest, HelperResponse,
    CAPTURE_HELPER_SCRIPT,
};
use super::{CaptureBackend, CaptureSession};

/// Default timeout for page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for waiting for network idle state.
pub const DEFAULT_NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the browser to launch and report ready.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(45);

/// Slack on top of the page timeouts before the helper is considered hung.
const RESPONSE_MARGIN: Duration = Duration::from_secs(15);

/// How long `close` waits for the browser to shut down on its own.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bytes of helper stderr kept for error reporting.
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Configuration options for the capture session.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    /// Fixed viewport; `None` keeps the browser default.
    pub viewport: Option<Viewport>,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Timeout for page navigation.
    pub navigation_timeout: Duration,
    /// Timeout for waiting for network idle state.
    pub network_idle_timeout: Duration,
    /// Timeout for the helper to launch the browser.
    pub launch_timeout: Duration,
    /// Forward helper stderr to our stderr.
    pub debug: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            viewport: None,
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            debug: false,
        }
    }
}

impl CaptureOptions {
    fn response_timeout(&self) -> Duration {
        self.navigation_timeout + self.network_idle_timeout + RESPONSE_MARGIN
    }
}

/// Launches [`PlaywrightSession`]s.
#[derive(Debug, Clone, Default)]
pub struct PlaywrightBackend {
    options: CaptureOptions,
}

impl PlaywrightBackend {
    pub fn new(options: CaptureOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }
}

impl CaptureBackend for PlaywrightBackend {
    type Session = PlaywrightSession;

    async fn launch(&self) -> Result<PlaywrightSession> {
        PlaywrightSession::launch(&self.options).await
    }
}

/// One browser instance with one page, reused across routes.
#[derive(Debug)]
pub struct PlaywrightSession {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    response_timeout: Duration,
}

impl PlaywrightSession {
    pub async fn launch(options: &CaptureOptions) -> Result<Self> {
        ensure_node_available(&options.node_command).await?;
        ensure_playwright_available(&options.node_command).await?;

        let (width, height) = options
            .viewport
            .map(|vp| (vp.width, vp.height))
            .unwrap_or((0, 0));

        let mut cmd = Command::new(&options.node_command);
        cmd.arg("-e")
            .arg(CAPTURE_HELPER_SCRIPT)
            .arg(if options.headless { "1" } else { "0" })
            .arg(width.to_string())
            .arg(height.to_string())
            .arg(options.navigation_timeout.as_millis().to_string())
            .arg(options.network_idle_timeout.as_millis().to_string());
        detach_group(&mut cmd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(
            viewport = ?options.viewport,
            headless = options.headless,
            "launching headless browser"
        );
        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &options.node_command))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PrerenderError::browser("Failed to capture helper stdout"))?;
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(collect_stderr(err, options.debug)));

        let mut session = Self {
            child: Some(child),
            stdin,
            stdout: BufReader::new(stdout).lines(),
            stderr_task,
            response_timeout: options.response_timeout(),
        };

        match session.read_response(options.launch_timeout).await {
            Ok(response) if response.status == "ready" => Ok(session),
            Ok(response) => {
                session.close().await;
                Err(map_playwright_status_error(
                    &response.status,
                    response.message.unwrap_or_default(),
                ))
            }
            Err(err) => {
                session.close().await;
                Err(err)
            }
        }
    }

    async fn read_response(&mut self, limit: Duration) -> Result<HelperResponse> {
        let line = match timeout(limit, self.stdout.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => return Err(self.exit_error().await),
            Ok(Err(err)) => return Err(PrerenderError::Io(err)),
            Err(_) => {
                return Err(PrerenderError::browser(format!(
                    "Playwright helper did not respond within {:?}",
                    limit
                )))
            }
        };

        serde_json::from_str(&line).map_err(|e| {
            PrerenderError::browser(format!(
                "Failed to parse Playwright output: {} - raw: {}",
                e,
                line.trim()
            ))
        })
    }

    /// Builds the error for a helper whose stdout closed unexpectedly.
    async fn exit_error(&mut self) -> PrerenderError {
        let status = match self.child.as_mut() {
            Some(child) => match timeout(CLOSE_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) => status.to_string(),
                _ => "unknown".to_string(),
            },
            None => "unknown".to_string(),
        };
        let stderr = match self.stderr_task.take() {
            Some(task) => timeout(CLOSE_TIMEOUT, task)
                .await
                .ok()
                .and_then(|joined| joined.ok())
                .unwrap_or_default(),
            None => String::new(),
        };
        map_playwright_error(status, &stderr)
    }

    async fn send(&mut self, request: &HelperRequest<'_>) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| PrerenderError::browser("Browser session is closed"))?;
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }
}

impl CaptureSession for PlaywrightSession {
    async fn capture(&mut self, url: &str, remove_selector: Option<&str>) -> Result<String> {
        self.send(&HelperRequest::capture(url, remove_selector))
            .await?;
        let response = self.read_response(self.response_timeout).await?;

        match (response.status.as_str(), response.html) {
            ("ok", Some(html)) => Ok(html),
            ("ok", None) => Err(PrerenderError::browser(
                "Playwright returned ok status but no document",
            )),
            (status, _) => Err(map_playwright_status_error(
                status,
                response.message.unwrap_or_default(),
            )),
        }
    }

    async fn close(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        if let Some(mut stdin) = self.stdin.take() {
            if let Ok(mut line) = serde_json::to_string(&HelperRequest::close()) {
                line.push('\n');
                let _ = stdin.write_all(line.as_bytes()).await;
                let _ = stdin.flush().await;
            }
        }

        match timeout(CLOSE_TIMEOUT, child.wait()).await {
            // Chromium children can outlive the helper.
            Ok(_) => {
                if let Some(pid) = pid {
                    signal_tree(pid, Termination::Forceful);
                }
            }
            Err(_) => {
                tracing::debug!("browser did not close in time; terminating helper");
                terminate_tree(&mut child, crate::process::STOP_GRACE_PERIOD).await;
            }
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        tracing::debug!("browser closed");
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Some(pid) = child.id() {
                signal_tree(pid, Termination::Forceful);
            }
            let _ = child.start_kill();
        }
    }
}

/// Reads helper stderr to EOF, keeping the last [`STDERR_TAIL_BYTES`] for
/// error reporting. Invalid UTF-8 is kept lossily so the pipe is never
/// abandoned.
async fn collect_stderr<R>(stderr: R, forward: bool) -> String
where
    R: AsyncRead + Unpin,
{
    let mut tail = String::new();
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if forward {
            eprintln!("[browser] {line}");
        }
        tail.push_str(line);
        tail.push('\n');
        if tail.len() > STDERR_TAIL_BYTES {
            let mut cut = tail.len() - STDERR_TAIL_BYTES;
            while !tail.is_char_boundary(cut) {
                cut += 1;
            }
            tail.drain(..cut);
        }
    }
    tail
}
