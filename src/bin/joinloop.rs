// src/bin/joinloop.rs

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{CommandFactory, FromArgMatches};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::FormatTime;

use joinloop::cli::{Cli, Commands};
use joinloop::commands::reference::print_reference;
use joinloop::commands::sweep::{SweepOptions, sweep};
use joinloop::install_segfault_handler;

/// A timer that outputs nothing but still enables span timing calculation
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(
        &self,
        _w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> std::fmt::Result {
        Ok(())
    }
}

fn main() -> ExitCode {
    // Crashes inside generated code report the combination being run
    install_segfault_handler();

    // JOINLOOP_LOG enables tracing; JOINLOOP_LOG_STYLE=full adds timestamps.
    // Logs go to stderr so stdout stays the tuple stream.
    if let Ok(filter) = EnvFilter::try_from_env("JOINLOOP_LOG") {
        let style = std::env::var("JOINLOOP_LOG_STYLE").unwrap_or_default();
        if style == "full" {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_writer(std::io::stderr)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_timer(NoTimestamp)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(std::io::stderr)
                .init();
        }
        tracing::debug!("tracing initialized");
    }

    let styles = Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default());

    let cli = match Cli::from_arg_matches(&Cli::command().styles(styles).get_matches()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    match cli.command {
        Commands::Sweep {
            selection,
            emit,
            dump_ir,
            disasm,
        } => sweep(
            &selection,
            SweepOptions {
                emit,
                dump_ir,
                disasm,
                release: cli.release,
            },
        ),
        Commands::Reference { selection } => print_reference(&selection),
    }
}
