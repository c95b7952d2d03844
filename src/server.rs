//! Lifecycle of the static file server that serves the build output.

use crate::process::{detach_group, shell_command, signal_tree, terminate_tree, Termination};
use crate::{PrerenderError, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;

pub use crate::process::STOP_GRACE_PERIOD;

/// Serves `{dir}` on `{port}` with SPA fallback.
pub const DEFAULT_SERVER_COMMAND: &str = "npx --yes serve -s {dir} -l {port}";

/// Readiness probes before giving up.
pub const DEFAULT_READY_ATTEMPTS: u32 = 30;

/// Delay between readiness probes.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Shell command template; `{dir}` and `{port}` are substituted.
    pub command: String,
    /// Forward the server's stdout/stderr to our stderr.
    pub debug: bool,
    pub ready_attempts: u32,
    pub poll_interval: Duration,
    pub stop_grace: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            command: DEFAULT_SERVER_COMMAND.to_string(),
            debug: false,
            ready_attempts: DEFAULT_READY_ATTEMPTS,
            poll_interval: READY_POLL_INTERVAL,
            stop_grace: STOP_GRACE_PERIOD,
        }
    }
}

/// Expands the server command template for `dir` and `port`.
pub fn render_command(template: &str, dir: &Path, port: u16) -> String {
    template
        .replace("{dir}", &shell_quote(&dir.to_string_lossy()))
        .replace("{port}", &port.to_string())
}

#[cfg(unix)]
fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(windows)]
fn shell_quote(value: &str) -> String {
    format!("\"{value}\"")
}

/// A running static server bound to one port.
///
/// Dropping a handle that was never stopped kills the process group.
#[derive(Debug)]
pub struct StaticServer {
    child: Option<Child>,
    port: u16,
    ready: bool,
    options: ServerOptions,
}

impl StaticServer {
    /// Spawns the server for `dir` on `port` as a process-group leader.
    pub fn start(dir: &Path, port: u16, options: ServerOptions) -> Result<Self> {
        let line = render_command(&options.command, dir, port);
        tracing::debug!(command = %line, port, "starting static server");

        let mut cmd = shell_command(&line);
        detach_group(&mut cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| PrerenderError::ServerSpawn(format!("{line}: {e}")))?;

        if let Some(out) = child.stdout.take() {
            tokio::spawn(drain_lines(out, "server", options.debug));
        }
        if let Some(err) = child.stderr.take() {
            tokio::spawn(drain_lines(err, "server", options.debug));
        }

        Ok(Self {
            child: Some(child),
            port,
            ready: false,
            options,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Root URL the server answers on.
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Polls the server root until it answers with a success status.
    pub async fn await_ready(&mut self) -> Result<()> {
        let url = self.base_url();
        let attempts = self.options.ready_attempts;
        let interval = self.options.poll_interval;

        let exited = wait_until_ready(&url, attempts, interval, || self.has_exited()).await?;
        if let Some(status) = exited {
            return Err(PrerenderError::ServerSpawn(format!(
                "server exited before becoming ready ({status})"
            )));
        }
        self.ready = true;
        tracing::debug!(port = self.port, "static server ready");
        Ok(())
    }

    fn has_exited(&mut self) -> Option<String> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            _ => None,
        }
    }

    /// Terminates the server's process group. Idempotent and infallible.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        tracing::debug!(port = self.port, "stopping static server");
        terminate_tree(&mut child, self.options.stop_grace).await;
        self.ready = false;
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Some(pid) = child.id() {
                signal_tree(pid, Termination::Forceful);
            }
            let _ = child.start_kill();
        }
    }
}

/// Polls `url` up to `attempts` times, `interval` apart, until a success
/// response arrives. `exited` is checked before every probe; `Ok(Some(_))`
/// means the process went away first.
pub(crate) async fn wait_until_ready(
    url: &str,
    attempts: u32,
    interval: Duration,
    mut exited: impl FnMut() -> Option<String>,
) -> Result<Option<String>> {
    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
    let port = reqwest::Url::parse(url)?.port_or_known_default().unwrap_or(0);

    for attempt in 1..=attempts {
        if let Some(status) = exited() {
            return Ok(Some(status));
        }
        match client.get(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(None),
            Ok(response) => {
                tracing::debug!(attempt, status = %response.status(), "server not ready")
            }
            Err(err) => tracing::debug!(attempt, error = %err, "server not reachable yet"),
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(PrerenderError::ServerStartTimeout { port, attempts })
}

/// Reads `stream` to EOF so the child never blocks on a full pipe. Lines that
/// are not valid UTF-8 are forwarded lossily. Returns the number of lines read.
async fn drain_lines<R>(stream: R, label: &'static str, forward: bool) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                count += 1;
                if forward {
                    let line = String::from_utf8_lossy(&buf);
                    eprintln!("[{label}] {}", line.trim_end_matches(['\r', '\n']));
                }
            }
        }
    }
    count
}
