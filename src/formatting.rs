use std::fmt::Write as FmtWrite;
use std::io::IsTerminal;
use std::process::ExitCode;

use prerender_lib::{
    ErrorOutput, PrerenderError, PrerenderOutput, RunReport, PRERENDER_OUTPUT_VERSION,
};

use crate::cli::OutputFormat;

/// Exit code for any fatal error.
pub const FATAL_EXIT_CODE: u8 = 2;

/// Write the run report in the requested format.
pub fn write_report(report: RunReport, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => {
            let content = serde_json::to_string(&PrerenderOutput::Prerender(report))?;
            println!("{content}");
        }
        OutputFormat::Pretty => {
            let colorize = std::io::stderr().is_terminal();
            eprint!("{}", format_report(&report, colorize));
        }
    }
    Ok(())
}

/// Render an error and return the fatal exit code.
pub fn render_error(err: PrerenderError, format: OutputFormat) -> ExitCode {
    tracing::debug!(error = ?err, "run failed");
    let payload = err.to_payload();

    match format {
        OutputFormat::Json => {
            let body = PrerenderOutput::Error(ErrorOutput {
                version: PRERENDER_OUTPUT_VERSION.to_string(),
                error: payload,
            });
            let content =
                serde_json::to_string(&body).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            println!("{content}");
        }
        OutputFormat::Pretty => {
            let colorize = std::io::stderr().is_terminal();
            eprintln!("{} {}", color("Error:", "31", colorize), payload.message);
            if let Some(hint) = payload.remediation {
                eprintln!("{} {}", color("Hint:", "33", colorize), hint);
            }
        }
    }

    ExitCode::from(FATAL_EXIT_CODE)
}

/// Format the report for human consumption in a terminal.
pub fn format_report(report: &RunReport, colorize: bool) -> String {
    let mut buf = String::new();
    let header = color("Done", "32", colorize);
    writeln!(
        buf,
        "{header} Prerendered {} page{} into {} ({:.1}s, port {})",
        report.pages.len(),
        if report.pages.len() == 1 { "" } else { "s" },
        report.out_dir.display(),
        report.elapsed_ms as f64 / 1000.0,
        report.port
    )
    .ok();
    for page in &report.pages {
        writeln!(
            buf,
            "  {} → {} ({} bytes)",
            page.route,
            page.path.display(),
            page.bytes
        )
        .ok();
    }
    buf
}

fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}
