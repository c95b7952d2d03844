//! Run configuration: file loading, validation and route resolution.

use crate::port::{DEFAULT_PORT_ATTEMPTS, DEFAULT_START_PORT};
use crate::process::shell_command;
use crate::server::{DEFAULT_READY_ATTEMPTS, DEFAULT_SERVER_COMMAND};
use crate::{PrerenderError, Result, Viewport};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use url::Url;

/// Files looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "prerender.toml",
    "prerender.json",
    "prerender.yaml",
    "prerender.yml",
];

pub const DEFAULT_BUILD_COMMAND: &str = "npm run build";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Config {
    pub routes: Vec<String>,
    /// Shell command printing additional routes (JSON array or one per line).
    pub routes_command: Option<String>,
    pub out_dir: PathBuf,
    pub serve_dir: PathBuf,
    pub flat_output: bool,
    pub build_command: String,
    pub server_command: String,
    pub skip_prerender_selector: Option<String>,
    pub viewport: Option<Viewport>,
    pub start_port: u16,
    pub port_attempts: u16,
    pub ready_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle_timeout: Duration,
    pub node_command: String,
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            routes: vec!["/".to_string()],
            routes_command: None,
            out_dir: PathBuf::from("prerendered"),
            serve_dir: PathBuf::from("dist"),
            flat_output: false,
            build_command: DEFAULT_BUILD_COMMAND.to_string(),
            server_command: DEFAULT_SERVER_COMMAND.to_string(),
            skip_prerender_selector: None,
            viewport: None,
            start_port: DEFAULT_START_PORT,
            port_attempts: DEFAULT_PORT_ATTEMPTS,
            ready_attempts: DEFAULT_READY_ATTEMPTS,
            navigation_timeout: Duration::from_secs(30),
            network_idle_timeout: Duration::from_secs(10),
            node_command: "node".to_string(),
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl Config {
    /// First config file present in `dir`, if any.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Loads `explicit` if given, else the first discovered file in the
    /// working directory, else defaults. Returns the file actually used.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(PrerenderError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Self::discover(&std::env::current_dir()?),
        };

        match path {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            PrerenderError::Config(format!(
                "Unsupported config file extension: {} (expected .toml, .json, .yaml or .yml)",
                path.display()
            ))
        })?;
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, format).map_err(|e| match e {
            PrerenderError::Config(msg) => PrerenderError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self> {
        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(PrerenderError::Config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.routes.is_empty() && self.routes_command.is_none() {
            return Err(PrerenderError::Config(
                "No routes configured; set routes or routesCommand".to_string(),
            ));
        }
        for route in &self.routes {
            validate_route(route)?;
        }
        if self.port_attempts == 0 {
            return Err(PrerenderError::Config(
                "portAttempts must be at least 1".to_string(),
            ));
        }
        if u32::from(self.start_port) + u32::from(self.port_attempts) > u32::from(u16::MAX) + 1 {
            return Err(PrerenderError::Config(format!(
                "Port range {}+{} exceeds 65535",
                self.start_port, self.port_attempts
            )));
        }
        if self.ready_attempts == 0 {
            return Err(PrerenderError::Config(
                "readyAttempts must be at least 1".to_string(),
            ));
        }
        if self.navigation_timeout.is_zero() {
            return Err(PrerenderError::Config(
                "navigationTimeout must be greater than zero".to_string(),
            ));
        }
        if self.network_idle_timeout.is_zero() {
            return Err(PrerenderError::Config(
                "networkIdleTimeout must be greater than zero".to_string(),
            ));
        }
        if !self.server_command.contains("{port}") {
            return Err(PrerenderError::Config(
                "serverCommand must contain a {port} placeholder".to_string(),
            ));
        }
        if let Some(selector) = &self.skip_prerender_selector {
            if selector.trim().is_empty() {
                return Err(PrerenderError::Config(
                    "skipPrerenderSelector must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Static routes followed by those printed by `routesCommand`, in order,
    /// without duplicates.
    pub async fn resolve_routes(&self) -> Result<Vec<String>> {
        let mut routes = self.routes.clone();
        if let Some(command) = &self.routes_command {
            tracing::debug!(%command, "resolving dynamic routes");
            routes.extend(run_routes_command(command).await?);
        }

        let mut seen = HashSet::new();
        routes.retain(|route| seen.insert(route.clone()));

        for route in &routes {
            validate_route(route)?;
        }
        if routes.is_empty() {
            return Err(PrerenderError::Config(
                "No routes to prerender after resolving routesCommand".to_string(),
            ));
        }
        Ok(routes)
    }
}

/// A route must be an absolute URL path that forms a valid URL on localhost.
pub fn validate_route(route: &str) -> Result<()> {
    if !route.starts_with('/') {
        return Err(PrerenderError::Config(format!(
            "Route {route:?} must start with '/'"
        )));
    }
    // `.` and `..` would resolve outside their own output directory.
    if route
        .split(['/', '?', '#'])
        .any(|segment| segment == "." || segment == "..")
    {
        return Err(PrerenderError::Config(format!(
            "Route {route:?} must not contain '.' or '..' segments"
        )));
    }
    Url::parse(&format!("http://localhost{route}"))?;
    Ok(())
}

/// Parses `routesCommand` output: a JSON array of strings, or one route per
/// line (blank lines and `#` comments skipped).
pub fn parse_route_list(output: &str) -> Result<Vec<String>> {
    let trimmed = output.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(trimmed).map_err(|e| {
            PrerenderError::Config(format!("routesCommand printed invalid JSON: {e}"))
        });
    }
    Ok(trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

async fn run_routes_command(command: &str) -> Result<Vec<String>> {
    let output = shell_command(command)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .await
        .map_err(|e| PrerenderError::Config(format!("Failed to run routesCommand: {e}")))?;
    if !output.status.success() {
        return Err(PrerenderError::Config(format!(
            "routesCommand `{command}` exited with {}",
            output.status
        )));
    }
    parse_route_list(&String::from_utf8_lossy(&output.stdout))
}
