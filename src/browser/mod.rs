//! Headless browser capture of rendered pages.
//!
//! The browser is driven through a long-lived Playwright helper running under
//! Node.js: one browser instance, one page, reused for every route.
//!
//! # Module Structure
//!
//! - [`session`] - Session launch, per-route capture and teardown
//! - [`playwright`] - Helper script, wire types, error mapping and availability checks
//!
//! # Example
//!
//! ```no_run
//! use prerender_lib::{CaptureBackend, CaptureOptions, CaptureSession, PlaywrightBackend};
//!
//! # async fn example() -> prerender_lib::Result<()> {
//! let backend = PlaywrightBackend::new(CaptureOptions::default());
//! let mut session = backend.launch().await?;
//! let html = session.capture("http://localhost:5050/about", Some(".ads")).await;
//! session.close().await;
//! println!("{} bytes", html?.len());
//! # Ok(())
//! # }
//! ```

use crate::Result;
use std::future::Future;

mod playwright;
mod session;

pub use session::{
    CaptureOptions, PlaywrightBackend, PlaywrightSession, DEFAULT_LAUNCH_TIMEOUT,
    DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT,
};

/// Starts browser sessions. The orchestrator launches exactly one per run.
pub trait CaptureBackend {
    type Session: CaptureSession;

    fn launch(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// A browser page that turns URLs into serialized documents.
pub trait CaptureSession: Send {
    /// Navigates to `url`, waits for network idle, removes every element
    /// matching `remove_selector` and returns the serialized document.
    fn capture(
        &mut self,
        url: &str,
        remove_selector: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Shuts the browser down. Safe to call more than once; never fails.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
