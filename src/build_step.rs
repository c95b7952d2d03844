//! Optional build step and the build-output check that precedes every run.

use crate::process::shell_command;
use crate::{PrerenderError, Result};
use std::path::Path;
use std::process::Stdio;

/// Fails with [`PrerenderError::BuildFolderNotFound`] unless `serve_dir` is a directory.
pub fn ensure_build_output(serve_dir: &Path) -> Result<()> {
    if serve_dir.is_dir() {
        Ok(())
    } else {
        Err(PrerenderError::BuildFolderNotFound(serve_dir.to_path_buf()))
    }
}

/// Runs the build command through the shell. Its stdout goes to our stderr
/// so stdout carries only the report.
pub async fn run_build(command: &str) -> Result<()> {
    tracing::info!(%command, "running build command");
    let status = shell_command(command)
        .stdin(Stdio::null())
        .stdout(Stdio::from(std::io::stderr()))
        .stderr(Stdio::inherit())
        .status()
        .await?;

    if !status.success() {
        return Err(PrerenderError::BuildFailed {
            command: command.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}
