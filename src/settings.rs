use std::path::{Path, PathBuf};
use std::time::Duration;

use prerender_lib::{
    CaptureOptions, Config, PipelineOptions, PrerenderError, ServerOptions, Viewport,
};

use crate::cli::Cli;

/// CLI values that override the config file when present.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub out_dir: Option<PathBuf>,
    pub serve_dir: Option<PathBuf>,
    pub flat_output: bool,
    pub viewport: Option<Viewport>,
    pub skip_selector: Option<String>,
    pub nav_timeout: Option<u64>,
    pub network_idle_timeout: Option<u64>,
    pub debug: bool,
}

impl CliOverrides {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            out_dir: cli.out_dir.clone(),
            serve_dir: cli.serve_dir.clone(),
            flat_output: cli.flat_output,
            viewport: cli.viewport,
            skip_selector: cli.skip_selector.clone(),
            nav_timeout: cli.nav_timeout,
            network_idle_timeout: cli.network_idle_timeout,
            debug: cli.debug,
        }
    }
}

/// Immutable settings for one run after merging CLI args and config file.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: Config,
    pub debug: bool,
}

impl RunSettings {
    pub fn pipeline_options(&self, routes: Vec<String>) -> PipelineOptions {
        let cfg = &self.config;
        PipelineOptions {
            routes,
            serve_dir: cfg.serve_dir.clone(),
            out_dir: cfg.out_dir.clone(),
            flat_output: cfg.flat_output,
            skip_prerender_selector: cfg.skip_prerender_selector.clone(),
            viewport: cfg.viewport,
            start_port: cfg.start_port,
            port_attempts: cfg.port_attempts,
            server: ServerOptions {
                command: cfg.server_command.clone(),
                debug: self.debug,
                ready_attempts: cfg.ready_attempts,
                ..ServerOptions::default()
            },
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        let cfg = &self.config;
        CaptureOptions {
            node_command: cfg.node_command.clone(),
            viewport: cfg.viewport,
            headless: cfg.headless,
            navigation_timeout: cfg.navigation_timeout,
            network_idle_timeout: cfg.network_idle_timeout,
            debug: self.debug,
            ..CaptureOptions::default()
        }
    }
}

/// Merge CLI overrides into the loaded config, preferring CLI values when given.
pub fn resolve_settings(mut config: Config, overrides: &CliOverrides) -> RunSettings {
    if let Some(dir) = &overrides.out_dir {
        config.out_dir = dir.clone();
    }
    if let Some(dir) = &overrides.serve_dir {
        config.serve_dir = dir.clone();
    }
    if overrides.flat_output {
        config.flat_output = true;
    }
    if overrides.viewport.is_some() {
        config.viewport = overrides.viewport;
    }
    if let Some(selector) = &overrides.skip_selector {
        config.skip_prerender_selector = Some(selector.clone());
    }
    if let Some(secs) = overrides.nav_timeout {
        config.navigation_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = overrides.network_idle_timeout {
        config.network_idle_timeout = Duration::from_secs(secs);
    }

    RunSettings {
        config,
        debug: overrides.debug,
    }
}

/// Load config from an explicit path, a discovered prerender.* file, or defaults.
/// Validation happens after CLI overrides are merged; see [`validate_settings`].
pub fn load_config(path: Option<&Path>) -> Result<(Config, Option<PathBuf>), PrerenderError> {
    Config::load(path)
}

/// Validate the merged settings, naming the config source on failure.
pub fn validate_settings(
    settings: &RunSettings,
    config_source: Option<&Path>,
) -> Result<(), PrerenderError> {
    settings.config.validate().map_err(|e| {
        let location = config_source
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string());
        match e {
            PrerenderError::Config(msg) => {
                PrerenderError::Config(format!("Invalid config ({location}): {msg}"))
            }
            other => other,
        }
    })
}

/// Format effective settings as a single-line string.
pub fn format_effective_config(settings: &RunSettings, config_source: Option<&Path>) -> String {
    let cfg = &settings.config;
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let viewport = cfg
        .viewport
        .map(|vp| vp.to_string())
        .unwrap_or_else(|| "browser default".to_string());
    format!(
        "Effective config [{source}]: serveDir={}, outDir={}, flatOutput={}, viewport={}, skipSelector={}, ports={}+{}, timeouts: nav={}s, network-idle={}s, debug={}",
        cfg.serve_dir.display(),
        cfg.out_dir.display(),
        cfg.flat_output,
        viewport,
        cfg.skip_prerender_selector.as_deref().unwrap_or("none"),
        cfg.start_port,
        cfg.port_attempts,
        cfg.navigation_timeout.as_secs(),
        cfg.network_idle_timeout.as_secs(),
        settings.debug
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_settings_prefers_config_when_flags_absent() {
        let cfg = Config {
            out_dir: PathBuf::from("cfg-out"),
            flat_output: true,
            navigation_timeout: Duration::from_secs(7),
            ..Config::default()
        };
        let settings = resolve_settings(cfg, &CliOverrides::default());

        assert_eq!(settings.config.out_dir, PathBuf::from("cfg-out"));
        assert!(settings.config.flat_output);
        assert_eq!(settings.config.navigation_timeout, Duration::from_secs(7));
        assert!(!settings.debug);
    }

    #[test]
    fn resolve_settings_prefers_cli_when_flags_present() {
        let overrides = CliOverrides {
            out_dir: Some(PathBuf::from("cli-out")),
            serve_dir: Some(PathBuf::from("build")),
            flat_output: true,
            viewport: Some(Viewport {
                width: 10,
                height: 20,
            }),
            skip_selector: Some(".ad".to_string()),
            nav_timeout: Some(50),
            network_idle_timeout: Some(6),
            debug: true,
        };
        let settings = resolve_settings(Config::default(), &overrides);
        let cfg = &settings.config;

        assert_eq!(cfg.out_dir, PathBuf::from("cli-out"));
        assert_eq!(cfg.serve_dir, PathBuf::from("build"));
        assert!(cfg.flat_output);
        assert_eq!(cfg.viewport.map(|v| v.width), Some(10));
        assert_eq!(cfg.skip_prerender_selector.as_deref(), Some(".ad"));
        assert_eq!(cfg.navigation_timeout, Duration::from_secs(50));
        assert_eq!(cfg.network_idle_timeout, Duration::from_secs(6));
        assert!(settings.debug);
    }

    #[test]
    fn debug_flag_is_threaded_into_server_and_capture_options() {
        let settings = resolve_settings(
            Config::default(),
            &CliOverrides {
                debug: true,
                ..CliOverrides::default()
            },
        );
        let pipeline = settings.pipeline_options(vec!["/".to_string()]);
        assert!(pipeline.server.debug);
        assert_eq!(pipeline.server.ready_attempts, 30);
        assert!(settings.capture_options().debug);
    }

    #[test]
    fn validate_settings_checks_cli_overrides() {
        let empty_selector = resolve_settings(
            Config::default(),
            &CliOverrides {
                skip_selector: Some(String::new()),
                ..CliOverrides::default()
            },
        );
        let err = validate_settings(&empty_selector, None).unwrap_err();
        assert!(
            err.to_string().contains("Invalid config (defaults)"),
            "got: {err}"
        );
        assert!(err.to_string().contains("skipPrerenderSelector"));

        let zero_nav = resolve_settings(
            Config::default(),
            &CliOverrides {
                nav_timeout: Some(0),
                ..CliOverrides::default()
            },
        );
        let err = validate_settings(&zero_nav, Some(Path::new("prerender.toml"))).unwrap_err();
        assert!(err.to_string().contains("prerender.toml"));
        assert!(err.to_string().contains("navigationTimeout"));

        let ok = resolve_settings(Config::default(), &CliOverrides::default());
        assert!(validate_settings(&ok, None).is_ok());
    }

    #[test]
    fn format_effective_config_includes_fields() {
        let settings = resolve_settings(Config::default(), &CliOverrides::default());
        let summary = format_effective_config(&settings, Some(Path::new("prerender.toml")));
        assert!(summary.contains("prerender.toml"));
        assert!(summary.contains("serveDir=dist"));
        assert!(summary.contains("outDir=prerendered"));
        assert!(summary.contains("viewport=browser default"));
        assert!(summary.contains("ports=5050+100"));
        assert!(summary.contains("nav=30s"));
    }
}
