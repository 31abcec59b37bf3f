//! Window-manager subscription subprocess
//!
//! Spawns the subscriber (`bspc subscribe` by default) and exposes its
//! stdout line by line. The child is killed if the handle is dropped, so an
//! aborted event loop never leaves an orphan behind.

use anyhow::{anyhow, Context, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

pub struct Subscription {
    child: Child,
    reader: BufReader<ChildStdout>,
    buffer: Vec<u8>,
}

impl Subscription {
    pub fn spawn(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("subscriber command is empty"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn subscriber {program:?}"))?;

        let stdout = child
            .stdout
            .take()
            .context("Subscriber stdout was not captured")?;

        info!(command = %argv.join(" "), pid = ?child.id(), "subscriber started");
        Ok(Self {
            child,
            reader: BufReader::new(stdout),
            buffer: Vec::new(),
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Next report line, `None` once the subscriber closed its stdout.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, so one odd desktop
    /// name cannot end the subscription.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.buffer.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .await
            .context("Failed to read subscriber output")?;
        if read == 0 {
            return Ok(None);
        }

        let mut line = self.buffer.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest.strip_suffix(b"\r").unwrap_or(rest);
        }
        Ok(Some(match std::str::from_utf8(line) {
            Ok(text) => text.to_string(),
            Err(e) => {
                warn!(error = %e, "subscriber sent invalid UTF-8, replacing");
                String::from_utf8_lossy(line).into_owned()
            }
        }))
    }

    /// Kill the subscriber and wait for it
    pub async fn terminate(mut self) {
        match self.child.kill().await {
            Ok(()) => debug!("subscriber killed"),
            Err(e) => warn!(error = %e, "failed to kill subscriber"),
        }
    }

    /// Wait for a subscriber that already closed its output
    pub async fn reap(mut self) {
        match self.child.wait().await {
            Ok(status) => info!(%status, "subscriber exited"),
            Err(e) => warn!(error = %e, "failed to reap subscriber"),
        }
    }
}
