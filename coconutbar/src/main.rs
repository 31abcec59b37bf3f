//! coconutbar - status line driver for bspwm
//!
//! Runs two units side by side until a termination signal arrives:
//! - poll unit: system line on the left, clock in the center
//! - event unit: desktop summary from `bspc subscribe` on the right
//!
//! Output is lemonbar markup, written to stdout or to a spawned `--panel`.

use anyhow::{Context, Result};
use clap::Parser;
use coconutbar::driver::{self, PollSettings};
use coconutbar::{Bar, Cli, LemonbarSurface, Sampler, Settings, Surface, WorkspaceEventParser};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// How long the units get to stop before they are aborted
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries bar markup, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coconutbar=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)
        .await
        .context("Invalid configuration")?;
    debug!(?settings, "configuration resolved");

    if cli.once {
        let line = driver::render_once(Sampler::default(), settings.template(), settings.delay()?)
            .await
            .context("Failed to render telemetry")?;
        println!("{line}");
        return Ok(());
    }

    run(settings).await
}

async fn run(settings: Settings) -> Result<()> {
    let (surface, mut panel) = match settings.panel_command()? {
        Some(argv) => {
            let mut child = spawn_panel(&argv)?;
            let stdin = child.stdin.take().context("Panel stdin was not captured")?;
            let surface: Arc<dyn Surface> = Arc::new(LemonbarSurface::new(stdin, settings.colors()));
            (surface, Some(child))
        }
        None => {
            let surface: Arc<dyn Surface> =
                Arc::new(LemonbarSurface::new(std::io::stdout(), settings.colors()));
            (surface, None)
        }
    };

    let shutdown = CancellationToken::new();
    let bar = Bar::new(surface, shutdown.clone());

    let poll = PollSettings {
        template: settings.template(),
        clock: settings.clock()?,
        delay: settings.delay()?,
    };
    let units = vec![
        (
            "poll",
            driver::spawn_unit("poll", driver::poll_loop(Sampler::default(), poll, bar.clone())),
        ),
        (
            "events",
            driver::spawn_unit(
                "events",
                driver::event_loop(
                    settings.subscribe_command()?,
                    WorkspaceEventParser::new(settings.decorations()),
                    bar,
                ),
            ),
        ),
    ];
    info!("coconutbar running");

    wait_for_termination().await?;
    info!("shutting down");
    shutdown.cancel();
    driver::join_units(units, SHUTDOWN_GRACE).await;

    if let Some(child) = panel.as_mut() {
        stop_panel(child);
    }
    info!("coconutbar stopped");
    Ok(())
}

fn spawn_panel(argv: &[String]) -> Result<Child> {
    let (program, args) = argv.split_first().context("Panel command is empty")?;
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn panel {program:?}"))?;
    info!(command = %argv.join(" "), pid = child.id(), "panel started");
    Ok(child)
}

fn stop_panel(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(error = %e, "failed to kill panel");
        return;
    }
    match child.wait() {
        Ok(status) => debug!(%status, "panel exited"),
        Err(e) => warn!(error = %e, "failed to reap panel"),
    }
}

async fn wait_for_termination() -> Result<()> {
    let mut interrupt = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut quit = signal(SignalKind::quit()).context("Failed to install SIGQUIT handler")?;

    tokio::select! {
        _ = interrupt.recv() => info!(signal = "SIGINT", "termination requested"),
        _ = terminate.recv() => info!(signal = "SIGTERM", "termination requested"),
        _ = quit.recv() => info!(signal = "SIGQUIT", "termination requested"),
    }
    Ok(())
}
