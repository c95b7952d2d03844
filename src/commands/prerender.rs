use std::process::ExitCode;
use std::sync::Arc;

use prerender_lib::{
    ensure_build_output, run_build, PlaywrightBackend, Prerenderer, ProgressCallback,
};

use crate::cli::Cli;
use crate::formatting::{render_error, write_report};
use crate::settings::{
    format_effective_config, load_config, resolve_settings, validate_settings, CliOverrides,
};

/// Exit code after Ctrl-C.
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Run the prerender command.
pub async fn run_prerender(cli: Cli) -> ExitCode {
    let format = cli.format;
    let (config, config_source) = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => return render_error(err, format),
    };
    let settings = resolve_settings(config, &CliOverrides::from_cli(&cli));
    if let Err(err) = validate_settings(&settings, config_source.as_deref()) {
        return render_error(err, format);
    }
    if cli.verbose {
        eprintln!(
            "{}",
            format_effective_config(&settings, config_source.as_deref())
        );
    }

    if cli.with_build {
        if cli.verbose {
            eprintln!("Running build: {}\u{2026}", settings.config.build_command);
        }
        if let Err(err) = run_build(&settings.config.build_command).await {
            return render_error(err, format);
        }
    }
    if let Err(err) = ensure_build_output(&settings.config.serve_dir) {
        return render_error(err, format);
    }

    let routes = match settings.config.resolve_routes().await {
        Ok(routes) => routes,
        Err(err) => return render_error(err, format),
    };
    if cli.verbose {
        eprintln!("Prerendering {} route(s)\u{2026}", routes.len());
    }

    let progress: ProgressCallback = Arc::new(|msg: &str| eprintln!("{msg}"));
    let prerenderer = Prerenderer::new(
        settings.pipeline_options(routes),
        PlaywrightBackend::new(settings.capture_options()),
    )
    .with_progress(progress);

    // Dropping the run future kills the server and browser process groups.
    let outcome = tokio::select! {
        result = prerenderer.run() => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted; stopped static server and browser.");
            return ExitCode::from(INTERRUPTED_EXIT_CODE);
        }
    };

    match outcome {
        Ok(report) => match write_report(report, format) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => render_error(err.into(), format),
        },
        Err(err) => render_error(err, format),
    }
}
