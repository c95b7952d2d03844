//! Prerender Library
//!
//! Turns a built single-page application into static HTML files: the build
//! output is served on a free local port, a headless browser visits every
//! configured route, and the rendered DOM of each page is written to disk.
//!
//! # Module Overview
//!
//! - [`port`] - Free local port discovery
//! - [`server`] - Static file server lifecycle (spawn, readiness, teardown)
//! - [`browser`] - Headless browser capture via Playwright
//! - [`writer`] - Route to file mapping and persistence
//! - [`pipeline`] - The orchestrated run with guaranteed cleanup
//! - [`config`] - Configuration files and route resolution
//! - [`build_step`] - Build command and build-output check
//!
//! # Example
//!
//! ```no_run
//! use prerender_lib::{CaptureOptions, PipelineOptions, PlaywrightBackend, Prerenderer};
//!
//! # async fn example() -> prerender_lib::Result<()> {
//! let options = PipelineOptions {
//!     routes: vec!["/".into(), "/about".into()],
//!     ..PipelineOptions::default()
//! };
//! let backend = PlaywrightBackend::new(CaptureOptions::default());
//! let report = Prerenderer::new(options, backend).run().await?;
//! println!("wrote {} pages", report.pages.len());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod build_step;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod port;
pub mod process;
pub mod progress;
pub mod server;
pub mod viewport;
pub mod writer;

pub use browser::{
    CaptureBackend, CaptureOptions, CaptureSession, PlaywrightBackend, PlaywrightSession,
    DEFAULT_LAUNCH_TIMEOUT, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT,
};
pub use build_step::{ensure_build_output, run_build};
pub use config::{Config, ConfigFormat};
pub use error::{ErrorCategory, ErrorPayload, PrerenderError, Result};
pub use output::{
    ErrorOutput, PageRecord, PrerenderOutput, RunReport, PRERENDER_OUTPUT_VERSION,
};
pub use pipeline::{page_url, PipelineOptions, Prerenderer};
pub use port::find_available_port;
pub use progress::ProgressCallback;
pub use server::{ServerOptions, StaticServer};
pub use viewport::Viewport;
pub use writer::{route_output_path, safe_name, OutputWriter};
