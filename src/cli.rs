use clap::{Parser, ValueEnum};
use prerender_lib::Viewport;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prerender")]
#[command(
    version,
    about = "Prerender a built single-page application into static HTML files",
    long_about = "Prerender\n\nServes the build output on a free local port, visits every configured route in a headless browser (Playwright) and writes the rendered HTML to the output directory.\n\nRoutes and paths come from prerender.toml/.json/.yaml (or --config); flags override the file."
)]
pub struct Cli {
    #[arg(long, help = "Run buildCommand before prerendering")]
    pub with_build: bool,

    #[arg(long, help = "Show static server and browser helper output")]
    pub debug: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        value_name = "PATH",
        help = "Config file (.toml, .json, .yaml); defaults to prerender.* in the working directory"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Directory for the generated HTML files")]
    pub out_dir: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Build output directory to serve")]
    pub serve_dir: Option<PathBuf>,

    #[arg(long, help = "Write name.html files instead of name/index.html")]
    pub flat_output: bool,

    #[arg(long, help = "Fixed viewport for every route (WIDTHxHEIGHT)")]
    pub viewport: Option<Viewport>,

    #[arg(
        long,
        value_name = "SELECTOR",
        help = "Remove elements matching this CSS selector before serializing"
    )]
    pub skip_selector: Option<String>,

    #[arg(long, value_name = "SECS", help = "Navigation timeout (seconds) per route")]
    pub nav_timeout: Option<u64>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Network idle timeout (seconds) per route"
    )]
    pub network_idle_timeout: Option<u64>,

    #[arg(long, value_enum, default_value = "pretty", help = "Report format")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
