//! Presentation surface
//!
//! The bar has three independent text regions. Both loops write through a
//! [`Bar`], which drops writes once shutdown has begun.

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Left,
    Center,
    Right,
}

impl Region {
    fn index(self) -> usize {
        match self {
            Region::Left => 0,
            Region::Center => 1,
            Region::Right => 2,
        }
    }
}

/// Something that can display three text regions.
///
/// Each call must replace the whole region atomically; concurrent calls for
/// different regions are allowed.
pub trait Surface: Send + Sync {
    fn set_text(&self, region: Region, text: &str);
}

/// Shutdown-aware handle shared by the poll and event loops
#[derive(Clone)]
pub struct Bar {
    surface: Arc<dyn Surface>,
    shutdown: CancellationToken,
}

impl Bar {
    pub fn new(surface: Arc<dyn Surface>, shutdown: CancellationToken) -> Self {
        Self { surface, shutdown }
    }

    pub fn publish(&self, region: Region, text: &str) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.surface.set_text(region, text);
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

/// Colors applied to every emitted line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colors {
    pub foreground: String,
    pub background: String,
}

struct LemonbarState<W> {
    regions: [String; 3],
    sink: W,
}

/// Emits lemonbar-protocol lines, one full redraw per region write
pub struct LemonbarSurface<W> {
    colors: Colors,
    state: Mutex<LemonbarState<W>>,
}

impl<W: Write + Send> LemonbarSurface<W> {
    pub fn new(sink: W, colors: Colors) -> Self {
        Self {
            colors,
            state: Mutex::new(LemonbarState {
                regions: Default::default(),
                sink,
            }),
        }
    }

    fn line(&self, regions: &[String; 3]) -> String {
        format!(
            "%{{F{}}}%{{B{}}}%{{l}}{}%{{c}}{}%{{r}}{}\n",
            self.colors.foreground, self.colors.background, regions[0], regions[1], regions[2]
        )
    }
}

impl<W: Write + Send> Surface for LemonbarSurface<W> {
    fn set_text(&self, region: Region, text: &str) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let slot = &mut state.regions[region.index()];
        slot.clear();
        escape_into(slot, text);

        let line = self.line(&state.regions);
        let sink = &mut state.sink;
        let written = sink.write_all(line.as_bytes()).and_then(|()| sink.flush());
        if let Err(e) = written {
            warn!(error = %e, ?region, "failed to write bar line");
        }
    }
}

/// Region text as literal lemonbar text: `%` doubled so `%{` cannot start a
/// format block, newlines flattened so one redraw stays one line
fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '%' => out.push_str("%%"),
            '\n' => out.push(' '),
            c => out.push(c),
        }
    }
}
