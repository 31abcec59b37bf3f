//! coconutbar - a clean, minimalistic status bar driver for bspwm
//!
//! Samples host telemetry (CPU, memory, temperature, network, IP, clock)
//! and follows `bspc subscribe`, rendering both into the three regions of a
//! lemonbar-style panel.

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod panel;
pub mod rate;
pub mod subscription;
pub mod template;
pub mod workspace;

pub use clock::ClockFormat;
pub use config::{Cli, Settings};
pub use error::{ConfigError, SampleError};
pub use metrics::{MetricSnapshot, NetRates, ProcSources, Reading, Sampler, Telemetry};
pub use panel::{Bar, LemonbarSurface, Region, Surface};
pub use template::Template;
pub use workspace::{BracketPair, Decorations, WorkspaceEventParser};
