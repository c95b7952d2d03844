use crate::error::ErrorPayload;
use crate::Viewport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version for output payloads.
pub const PRERENDER_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum PrerenderOutput {
    Prerender(RunReport),
    Error(ErrorOutput),
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub version: String,
    pub port: u16,
    pub out_dir: PathBuf,
    pub flat_output: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    pub pages: Vec<PageRecord>,
    pub elapsed_ms: u64,
}

/// One route written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub route: String,
    pub path: PathBuf,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    pub error: ErrorPayload,
}
