//! Playwright integration for headless browser automation.
//!
//! This module contains the inline capture helper script, error mapping,
//! and availability checks for Node.js and Playwright.

use crate::{PrerenderError, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Long-lived capture helper.
///
/// Launches one Chromium and one page, reports `ready`, then answers one
/// JSON request per stdin line until `close` or EOF.
pub(crate) const CAPTURE_HELPER_SCRIPT: &str = r#"
const readline = require('readline');
const [, headlessFlag, width, height, navTimeout, idleTimeout] = process.argv;

function send(payload) {
  process.stdout.write(JSON.stringify(payload) + '\n');
}

async function run() {
  let browser;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch({
      headless: headlessFlag !== '0',
      args: ['--no-sandbox', '--disable-setuid-sandbox', '--disable-dev-shm-usage']
    });
    const page = await browser.newPage();
    const viewportWidth = parseInt(width, 10);
    const viewportHeight = parseInt(height, 10);
    if (viewportWidth > 0 && viewportHeight > 0) {
      await page.setViewportSize({ width: viewportWidth, height: viewportHeight });
    }
    const navMs = parseInt(navTimeout, 10);
    const idleMs = parseInt(idleTimeout, 10);

    send({ status: 'ready' });

    const input = readline.createInterface({ input: process.stdin, terminal: false });
    for await (const line of input) {
      if (!line.trim()) continue;
      let request;
      try {
        request = JSON.parse(line);
      } catch (err) {
        send({ status: 'error', message: 'invalid request: ' + err.message });
        continue;
      }
      if (request.command === 'close') break;

      try {
        await page.goto(request.url, { waitUntil: 'networkidle', timeout: navMs });
        await page.waitForLoadState('networkidle', { timeout: idleMs });
        if (request.removeSelector) {
          await page.evaluate((selector) => {
            document.querySelectorAll(selector).forEach((el) => el.remove());
          }, request.removeSelector);
        }
        const html = await page.content();
        send({ status: 'ok', html });
      } catch (err) {
        const message = err && err.message ? err.message : String(err);
        send({ status: 'error', message });
      }
    }
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    console.error(JSON.stringify({ status: 'error', message }));
    process.exitCode = 1;
  } finally {
    if (browser) {
      await browser.close();
    }
  }
}

run();
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// One line written to the helper's stdin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HelperRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_selector: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<&'a str>,
}

impl<'a> HelperRequest<'a> {
    pub fn capture(url: &'a str, remove_selector: Option<&'a str>) -> Self {
        Self {
            url: Some(url),
            remove_selector,
            command: None,
        }
    }

    pub fn close() -> Self {
        Self {
            url: None,
            remove_selector: None,
            command: Some("close"),
        }
    }
}

/// One line read from the helper's stdout.
#[derive(Debug, Deserialize)]
pub(crate) struct HelperResponse {
    pub status: String,
    pub message: Option<String>,
    pub html: Option<String>,
}

/// Error result from the helper (stderr on fatal exit).
#[derive(Debug, Deserialize)]
pub(crate) struct ScriptError {
    pub status: String,
    pub message: String,
}

/// Maps a spawn error to an appropriate PrerenderError.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> PrerenderError {
    if err.kind() == io::ErrorKind::NotFound {
        PrerenderError::Browser(format!(
            "Unable to spawn Playwright helper; '{}' was not found on PATH",
            command
        ))
    } else {
        PrerenderError::Io(err)
    }
}

/// Maps helper stderr output to an appropriate PrerenderError.
pub(crate) fn map_playwright_error(status_text: impl Into<String>, stderr: &str) -> PrerenderError {
    let last_json = stderr
        .lines()
        .rev()
        .find_map(|line| serde_json::from_str::<ScriptError>(line.trim()).ok());
    if let Some(error) = last_json {
        return map_playwright_status_error(&error.status, error.message);
    }

    let lower = stderr.to_ascii_lowercase();

    if lower.contains("cannot find module 'playwright'") {
        return PrerenderError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        );
    }

    if lower.contains("timeout") {
        return PrerenderError::Browser(
            "Playwright timed out; try increasing --nav-timeout/--network-idle-timeout, and ensure the page finishes loading."
                .to_string(),
        );
    }

    PrerenderError::Browser(format!(
        "Playwright exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

/// Maps a helper status error to an appropriate PrerenderError.
pub(crate) fn map_playwright_status_error(status: &str, message: String) -> PrerenderError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        PrerenderError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        )
    } else if lower.contains("timeout") {
        PrerenderError::Browser(format!(
            "Playwright error (status {}): {}. Hint: increase --nav-timeout/--network-idle-timeout, and ensure the page reaches network idle.",
            status, message
        ))
    } else {
        PrerenderError::Browser(format!("Playwright error (status {}): {}", status, message))
    }
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            PrerenderError::Browser(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(PrerenderError::Browser(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures the Playwright npm package is installed.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            PrerenderError::Browser(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(
            format!("{:?}", output.status),
            &stderr,
        ));
    }

    Ok(())
}
