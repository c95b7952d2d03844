//! End-to-end run: port, server, browser, capture, write, teardown.

use crate::browser::{CaptureBackend, CaptureSession};
use crate::output::{PageRecord, RunReport, PRERENDER_OUTPUT_VERSION};
use crate::port::{find_available_port, DEFAULT_PORT_ATTEMPTS, DEFAULT_START_PORT};
use crate::progress::{log_progress, ProgressCallback};
use crate::server::{ServerOptions, StaticServer};
use crate::writer::{find_collisions, OutputWriter};
use crate::{PrerenderError, Result, Viewport};
use std::path::PathBuf;
use std::time::Instant;

/// Everything the orchestrator needs for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Routes in capture order.
    pub routes: Vec<String>,
    pub serve_dir: PathBuf,
    pub out_dir: PathBuf,
    pub flat_output: bool,
    pub skip_prerender_selector: Option<String>,
    /// Recorded in the report; the backend applies it.
    pub viewport: Option<Viewport>,
    pub start_port: u16,
    pub port_attempts: u16,
    pub server: ServerOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            routes: vec!["/".to_string()],
            serve_dir: PathBuf::from("dist"),
            out_dir: PathBuf::from("prerendered"),
            flat_output: false,
            skip_prerender_selector: None,
            viewport: None,
            start_port: DEFAULT_START_PORT,
            port_attempts: DEFAULT_PORT_ATTEMPTS,
            server: ServerOptions::default(),
        }
    }
}

impl PipelineOptions {
    /// Output files claimed by more than one route under the active naming mode.
    pub fn output_collisions(&self) -> Vec<(PathBuf, Vec<String>)> {
        find_collisions(&self.routes, &self.out_dir, self.flat_output)
    }
}

/// URL the browser loads for `route`.
pub fn page_url(base_url: &str, route: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), route)
}

/// Sequences the run and guarantees the browser and the server are released
/// on every exit path.
pub struct Prerenderer<B> {
    options: PipelineOptions,
    backend: B,
    progress: Option<ProgressCallback>,
}

impl<B: CaptureBackend> Prerenderer<B> {
    pub fn new(options: PipelineOptions, backend: B) -> Self {
        Self {
            options,
            backend,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs the whole pipeline. Pages written before a failure stay on disk.
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let opts = &self.options;

        for (path, routes) in opts.output_collisions() {
            tracing::warn!(
                path = %path.display(),
                routes = ?routes,
                "routes share an output file; later routes overwrite earlier ones"
            );
        }

        let port = find_available_port(opts.start_port, opts.port_attempts).await?;
        log_progress(
            &self.progress,
            &format!("Serving {} on port {}…", opts.serve_dir.display(), port),
        );

        let mut server = StaticServer::start(&opts.serve_dir, port, opts.server.clone())?;
        let outcome = self.serve_and_capture(&mut server).await;
        server.stop().await;
        let pages = outcome?;

        Ok(RunReport {
            version: PRERENDER_OUTPUT_VERSION.to_string(),
            port,
            out_dir: opts.out_dir.clone(),
            flat_output: opts.flat_output,
            viewport: opts.viewport,
            pages,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn serve_and_capture(&self, server: &mut StaticServer) -> Result<Vec<PageRecord>> {
        server.await_ready().await?;
        log_progress(&self.progress, "Launching headless browser…");

        let mut session = self.backend.launch().await?;
        let outcome = self.capture_routes(&mut session, &server.base_url()).await;
        session.close().await;
        outcome
    }

    async fn capture_routes<S: CaptureSession>(
        &self,
        session: &mut S,
        base_url: &str,
    ) -> Result<Vec<PageRecord>> {
        let opts = &self.options;
        let writer = OutputWriter::new(&opts.out_dir, opts.flat_output);
        writer.prepare().await?;

        let total = opts.routes.len();
        let mut pages = Vec::with_capacity(total);
        for (index, route) in opts.routes.iter().enumerate() {
            let url = page_url(base_url, route);
            tracing::debug!(%route, %url, "capturing");

            let html = session
                .capture(&url, opts.skip_prerender_selector.as_deref())
                .await
                .map_err(|err| match err {
                    PrerenderError::Browser(message) => PrerenderError::navigation(route, message),
                    other => other,
                })?;
            let path = writer.write(route, &html).await?;

            log_progress(
                &self.progress,
                &format!("[{}/{}] {} → {}", index + 1, total, route, path.display()),
            );
            pages.push(PageRecord {
                route: route.clone(),
                path,
                bytes: html.len(),
            });
        }
        Ok(pages)
    }
}
