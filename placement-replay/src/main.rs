//! # Placement Replay
//!
//! Command-line harness for recorded placement sessions.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use placement_replay::{load_engine_config, CliArgs, Replayer, StepReport, Trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing on stderr with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,placement_core=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,placement_core=debug"));

    // stdout carries the reports
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn print_report(out: &mut impl Write, report: &StepReport) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = load_engine_config(args.config.as_deref(), &args.overrides())
        .context("Failed to build engine configuration")?;
    tracing::info!(
        "Engine config: max_objects={}, scale {}..{}",
        config.max_objects,
        config.min_scale,
        config.max_scale
    );

    let trace = Trace::from_path(&args.trace)
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;
    tracing::info!(
        "Replaying {} steps ({} frames) from {}",
        trace.steps.len(),
        trace.frame_count(),
        args.trace.display()
    );

    let mut replayer = Replayer::new(config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Some(fps) = args.fps {
        let summary_only = args.summary;
        let mut last = None;
        replayer
            .run_paced(&trace, fps, |report| {
                if summary_only {
                    last = Some(report.clone());
                    return Ok(());
                }
                serde_json::to_writer(&mut out, report)?;
                writeln!(out).map_err(|source| placement_replay::ReplayError::Io {
                    path: "<stdout>".into(),
                    source,
                })?;
                Ok(())
            })
            .await
            .context("Paced replay aborted")?;
        if let Some(report) = last {
            print_report(&mut out, &report)?;
        }
    } else {
        let reports = replayer.run(&trace);
        let shown = if args.summary {
            reports.last().into_iter().collect::<Vec<_>>()
        } else {
            reports.iter().collect()
        };
        for report in shown {
            print_report(&mut out, report)?;
        }
    }

    let snapshot = replayer.session().snapshot();
    tracing::info!(
        "Replay finished: {:?}, {} object(s) placed",
        snapshot.status,
        snapshot.objects.len()
    );
    Ok(())
}
