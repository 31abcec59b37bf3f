//! The two concurrent units of the bar
//!
//! - poll unit: samples telemetry and the clock on a fixed interval
//! - event unit: turns subscriber reports into the workspace summary
//!
//! Both stop when the bar's shutdown token is cancelled. They share nothing
//! but the [`Bar`], and write to disjoint regions of it.

use crate::clock::ClockFormat;
use crate::metrics::Sampler;
use crate::panel::{Bar, Region};
use crate::subscription::Subscription;
use crate::template::Template;
use crate::workspace::WorkspaceEventParser;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Poll unit settings
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub template: Template,
    pub clock: ClockFormat,
    pub delay: Duration,
}

/// Sample, render and publish every `delay` until shutdown.
///
/// File and socket reads run on the blocking pool; the sampler travels there
/// and back so its rate counters never need a lock.
pub async fn poll_loop(mut sampler: Sampler, settings: PollSettings, bar: Bar) -> Result<()> {
    let shutdown = bar.shutdown_token().clone();
    let template = Arc::new(settings.template);
    let mut ticker = tokio::time::interval(settings.delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(delay = ?settings.delay, "poll loop started");
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let template = template.clone();
        let (returned, infos) = tokio::task::spawn_blocking(move || {
            let infos = template.render(&mut sampler);
            (sampler, infos)
        })
        .await
        .context("Telemetry sampling task failed")?;
        sampler = returned;

        bar.publish(Region::Left, &infos);
        bar.publish(Region::Center, &settings.clock.now());
    }

    debug!("poll loop stopped");
    Ok(())
}

/// Publish one workspace summary per subscriber line.
///
/// Ends cleanly when the subscriber closes its output; on shutdown the
/// subscriber is killed first.
pub async fn event_loop(command: Vec<String>, parser: WorkspaceEventParser, bar: Bar) -> Result<()> {
    let shutdown = bar.shutdown_token().clone();
    let mut subscription = Subscription::spawn(&command)?;

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            line = subscription.next_line() => Some(line),
        };

        let Some(line) = next else {
            subscription.terminate().await;
            debug!("event loop stopped");
            return Ok(());
        };

        match line {
            Ok(Some(line)) => {
                debug!(report = %line, "workspace report");
                bar.publish(Region::Right, &parser.summarize(&line));
            }
            Ok(None) => {
                info!("workspace subscription closed");
                subscription.reap().await;
                return Ok(());
            }
            Err(e) => {
                subscription.terminate().await;
                return Err(e);
            }
        }
    }
}

/// Sample twice, `delay` apart, so rates are primed; return the second render
pub async fn render_once(sampler: Sampler, template: Template, delay: Duration) -> Result<String> {
    let (sampler, _) = render_blocking(sampler, template.clone()).await?;
    tokio::time::sleep(delay).await;
    let (_, infos) = render_blocking(sampler, template).await?;
    Ok(infos)
}

async fn render_blocking(mut sampler: Sampler, template: Template) -> Result<(Sampler, String)> {
    tokio::task::spawn_blocking(move || {
        let infos = template.render(&mut sampler);
        (sampler, infos)
    })
    .await
    .context("Telemetry sampling task failed")
}

/// Spawn a unit whose outcome is logged as soon as it ends
pub fn spawn_unit<F>(name: &'static str, unit: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match unit.await {
            Ok(()) => info!(unit = name, "unit finished"),
            Err(e) => error!(unit = name, "unit failed: {:#}", e),
        }
    })
}

/// Wait for every unit up to `grace`, aborting the ones still running
pub async fn join_units(units: Vec<(&'static str, JoinHandle<()>)>, grace: Duration) {
    let deadline = Instant::now() + grace;
    for (name, mut handle) in units {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => debug!(unit = name, "unit joined"),
            Ok(Err(e)) => warn!(unit = name, error = %e, "unit panicked or was cancelled"),
            Err(_) => {
                warn!(unit = name, "unit did not stop in time, aborting");
                handle.abort();
            }
        }
    }
}
