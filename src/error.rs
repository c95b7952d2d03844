use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum PrerenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Build folder not found: {}", .0.display())]
    BuildFolderNotFound(PathBuf),

    #[error("Build command `{command}` failed ({status})")]
    BuildFailed { command: String, status: String },

    #[error("No available port found in {attempts} attempts starting at {start}")]
    NoAvailablePort { start: u16, attempts: u16 },

    #[error("Server on port {port} did not respond after {attempts} attempts")]
    ServerStartTimeout { port: u16, attempts: u32 },

    #[error("Failed to start static server: {0}")]
    ServerSpawn(String),

    #[error("Failed to prerender {route}: {message}")]
    Navigation { route: String, message: String },

    #[error("Browser error: {0}")]
    Browser(String),
}

impl PrerenderError {
    pub fn navigation(route: impl Into<String>, message: impl Into<String>) -> Self {
        PrerenderError::Navigation {
            route: route.into(),
            message: message.into(),
        }
    }

    pub fn browser(message: impl Into<String>) -> Self {
        PrerenderError::Browser(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            PrerenderError::Io(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check output directory paths/permissions.",
            ),
            PrerenderError::Network(e) => ErrorPayload::new(
                ErrorCategory::Server,
                e.to_string(),
                "Check that the static server can bind to localhost.",
            ),
            PrerenderError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Routes must be URL paths starting with '/' (e.g., /about).",
            ),
            PrerenderError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Browser,
                e.to_string(),
                "The Playwright helper produced malformed output; rerun with --debug.",
            ),
            PrerenderError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("routescommand") || lower.contains("routes command") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Make routesCommand print a JSON array of routes or one route per line.",
                    )
                } else if lower.contains("config file") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check the config file syntax (.toml, .json, .yaml) and that keys are camelCase.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/config values (e.g., --viewport WIDTHxHEIGHT, routes starting with '/').",
                    )
                }
            }
            PrerenderError::BuildFolderNotFound(_) => ErrorPayload::new(
                ErrorCategory::Build,
                self.to_string(),
                "Build the app first or pass --with-build to run buildCommand.",
            ),
            PrerenderError::BuildFailed { .. } => ErrorPayload::new(
                ErrorCategory::Build,
                self.to_string(),
                "Run the build command manually to inspect its output.",
            ),
            PrerenderError::NoAvailablePort { .. } => ErrorPayload::new(
                ErrorCategory::Server,
                self.to_string(),
                "Free a port in the scan range or set startPort in the config.",
            ),
            PrerenderError::ServerStartTimeout { .. } | PrerenderError::ServerSpawn(_) => {
                ErrorPayload::new(
                    ErrorCategory::Server,
                    self.to_string(),
                    "Check serverCommand (rerun with --debug to see server output).",
                )
            }
            PrerenderError::Navigation { message, .. } => {
                if message.to_ascii_lowercase().contains("timeout") {
                    ErrorPayload::new(
                        ErrorCategory::Navigation,
                        self.to_string(),
                        "Try increasing --nav-timeout/--network-idle-timeout; pages with open long-poll connections never reach network idle.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Navigation,
                        self.to_string(),
                        "Open the route in a browser against the build output to reproduce.",
                    )
                }
            }
            PrerenderError::Browser(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`).",
                    )
                } else if lower.contains("executable doesn't exist")
                    || lower.contains("chromium executable")
                {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Run `npx playwright install chromium` to download the browser.",
                    )
                } else if lower.contains("not found on path") || lower.contains("node command") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Node.js and ensure the node binary is on PATH (or set nodeCommand).",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Rerun with --debug to see the browser helper output.",
                    )
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PrerenderError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Build,
    Server,
    Browser,
    Navigation,
    Io,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_folder_payload_suggests_with_build() {
        let err = PrerenderError::BuildFolderNotFound(PathBuf::from("dist"));
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Build);
        assert!(payload.message.contains("Build folder not found"));
        let remediation = payload.remediation.unwrap_or_default();
        assert!(
            remediation.contains("--with-build"),
            "expected --with-build hint, got: {remediation}"
        );
    }

    #[test]
    fn navigation_timeout_payload_mentions_timeouts() {
        let err = PrerenderError::navigation("/feed", "Timeout 30000ms exceeded");
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Navigation);
        assert!(payload.message.contains("/feed"));
        let remediation = payload.remediation.unwrap_or_default();
        assert!(
            remediation.contains("--nav-timeout"),
            "expected timeout remediation, got: {remediation}"
        );
    }

    #[test]
    fn navigation_payload_without_timeout_uses_generic_hint() {
        let err = PrerenderError::navigation("/about", "net::ERR_CONNECTION_REFUSED");
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(!remediation.contains("--nav-timeout"));
    }

    #[test]
    fn browser_payload_includes_playwright_install_hint() {
        let err = PrerenderError::browser(
            "Playwright npm package is missing; install with `npm install playwright`.",
        );
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.contains("npm install playwright"),
            "expected playwright install hint, got: {remediation}"
        );
    }

    #[test]
    fn browser_payload_includes_node_hint() {
        let err = PrerenderError::browser(
            "Unable to spawn Playwright helper; 'node' was not found on PATH",
        );
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(remediation.to_ascii_lowercase().contains("node"));
    }

    #[test]
    fn routes_command_payload_explains_output_format() {
        let err = PrerenderError::Config("routesCommand exited with status 1".to_string());
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(remediation.contains("JSON array"));
    }

    #[test]
    fn no_available_port_message_names_start_and_attempts() {
        let err = PrerenderError::NoAvailablePort {
            start: 5050,
            attempts: 100,
        };
        assert_eq!(
            err.to_string(),
            "No available port found in 100 attempts starting at 5050"
        );
        assert_eq!(err.to_payload().category, ErrorCategory::Server);
    }

    #[test]
    fn payload_serializes_camel_case_and_lowercase_category() {
        let payload = PrerenderError::ServerStartTimeout {
            port: 5051,
            attempts: 30,
        }
        .to_payload();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["category"], "server");
        assert!(json["remediation"].as_str().unwrap().contains("--debug"));
    }
}
