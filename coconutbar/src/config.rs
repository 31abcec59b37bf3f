//! Configuration management
//!
//! Handles:
//! - Command-line flags (highest precedence)
//! - Optional TOML file in the user config directory
//! - Built-in defaults matching the classic coconutbar look
//!
//! `Settings` holds raw values; the accessors validate them into the types
//! the loops consume.

use crate::clock::ClockFormat;
use crate::error::ConfigError;
use crate::panel::Colors;
use crate::template::Template;
use crate::workspace::{BracketPair, Decorations};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DEFAULT_SYSTEM: &str = "CPU %CPU% | RAM %RAM% | %IP | ʌ %UP | v %DOWN";

/// A clean, minimalistic bar for bspwm
#[derive(Debug, Default, Parser)]
#[command(name = "coconutbar", version, about)]
pub struct Cli {
    /// Foreground color in #RGB or #RRGGBB format
    #[arg(long = "fg", value_name = "COLOR")]
    pub foreground: Option<String>,

    /// Background color in #RGB or #RRGGBB format
    #[arg(long = "bg", value_name = "COLOR")]
    pub background: Option<String>,

    /// Font handed to the panel, e.g. "Roboto 14 bold"
    #[arg(long)]
    pub font: Option<String>,

    /// Clock format, e.g. "%H:%M:%S"
    #[arg(long, value_name = "STRFTIME")]
    pub date: Option<String>,

    /// System line; understands %CPU %RAM %TEMP %IP %UP %DOWN
    #[arg(long, value_name = "TEMPLATE")]
    pub system: Option<String>,

    /// Seconds between two telemetry samples
    #[arg(long, value_name = "SECONDS")]
    pub delay: Option<f64>,

    /// Brackets around the focused desktop, e.g. "()" or "<< >>"
    #[arg(long, value_name = "PAIR")]
    pub focused: Option<BracketPair>,

    /// Brackets around the focused desktop in monocle layout
    #[arg(long, value_name = "PAIR")]
    pub fullscreen: Option<BracketPair>,

    /// Brackets around occupied, unfocused desktops
    #[arg(long, value_name = "PAIR")]
    pub active: Option<BracketPair>,

    /// Window-manager subscription command
    #[arg(long, value_name = "COMMAND")]
    pub subscribe: Option<String>,

    /// Panel to spawn and feed (default: write to stdout)
    #[arg(long, value_name = "COMMAND")]
    pub panel: Option<String>,

    /// Config file (default: <config dir>/coconutbar/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print one primed telemetry line and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub foreground: String,
    pub background: String,
    pub font: String,
    pub date: String,
    pub system: String,
    pub delay: f64,
    pub focused: BracketPair,
    pub fullscreen: BracketPair,
    pub active: BracketPair,
    pub subscribe: String,
    pub panel: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let decorations = Decorations::default();
        Self {
            foreground: "#BBB".to_string(),
            background: "#112".to_string(),
            font: "Helvetica 12 bold".to_string(),
            date: ClockFormat::default().as_str().to_string(),
            system: DEFAULT_SYSTEM.to_string(),
            delay: 1.0,
            focused: decorations.focused,
            fullscreen: decorations.fullscreen,
            active: decorations.active,
            subscribe: "bspc subscribe".to_string(),
            panel: None,
        }
    }
}

impl Settings {
    /// File settings overridden by flags, then validated
    pub async fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = Self::load(cli.config.as_deref()).await?;
        settings.apply(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Load the explicit file, else the default file if present, else defaults
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::config_file_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Unreadable {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&content, &path)
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file location
    pub fn config_file_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("coconutbar");
        path.push("config.toml");
        Some(path)
    }

    /// Flags given on the command line win over file values
    pub fn apply(&mut self, cli: &Cli) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut self.foreground, &cli.foreground);
        set(&mut self.background, &cli.background);
        set(&mut self.font, &cli.font);
        set(&mut self.date, &cli.date);
        set(&mut self.system, &cli.system);
        set(&mut self.delay, &cli.delay);
        set(&mut self.focused, &cli.focused);
        set(&mut self.fullscreen, &cli.fullscreen);
        set(&mut self.active, &cli.active);
        set(&mut self.subscribe, &cli.subscribe);
        if cli.panel.is_some() {
            self.panel = cli.panel.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.delay()?;
        self.clock()?;
        self.subscribe_command()?;
        self.panel_command()?;
        Ok(())
    }

    pub fn delay(&self) -> Result<Duration, ConfigError> {
        match Duration::try_from_secs_f64(self.delay) {
            Ok(delay) if !delay.is_zero() => Ok(delay),
            _ => Err(ConfigError::InvalidDelay(self.delay)),
        }
    }

    pub fn clock(&self) -> Result<ClockFormat, ConfigError> {
        ClockFormat::new(self.date.clone())
    }

    pub fn template(&self) -> Template {
        Template::parse(&self.system)
    }

    pub fn decorations(&self) -> Decorations {
        Decorations {
            focused: self.focused.clone(),
            fullscreen: self.fullscreen.clone(),
            active: self.active.clone(),
        }
    }

    pub fn colors(&self) -> Colors {
        Colors {
            foreground: self.foreground.clone(),
            background: self.background.clone(),
        }
    }

    pub fn subscribe_command(&self) -> Result<Vec<String>, ConfigError> {
        split_command("subscribe", &self.subscribe)
    }

    /// Panel argv with font and colors appended, if a panel is configured
    pub fn panel_command(&self) -> Result<Option<Vec<String>>, ConfigError> {
        let Some(panel) = &self.panel else {
            return Ok(None);
        };
        let mut argv = split_command("panel", panel)?;
        argv.extend([
            "-f".to_string(),
            self.font.clone(),
            "-F".to_string(),
            self.foreground.clone(),
            "-B".to_string(),
            self.background.clone(),
        ]);
        Ok(Some(argv))
    }
}

fn split_command(what: &'static str, line: &str) -> Result<Vec<String>, ConfigError> {
    let argv = shell_words::split(line).map_err(|_| ConfigError::BadQuoting {
        what,
        line: line.to_string(),
    })?;
    if argv.is_empty() {
        return Err(ConfigError::EmptyCommand(what));
    }
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.foreground, "#BBB");
        assert_eq!(settings.background, "#112");
        assert_eq!(settings.date, "%H:%M:%S");
        assert_eq!(settings.delay().unwrap(), Duration::from_secs(1));
        assert_eq!(settings.decorations(), Decorations::default());
        assert_eq!(settings.subscribe_command().unwrap(), ["bspc", "subscribe"]);
        assert_eq!(settings.panel_command().unwrap(), None);
        settings.validate().unwrap();
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "coconutbar",
            "--fg",
            "#fff",
            "--focused",
            "<< >>",
            "--delay",
            "2.5",
            "--once",
        ])
        .unwrap();
        assert_eq!(cli.foreground.as_deref(), Some("#fff"));
        assert_eq!(cli.focused, Some(BracketPair::new("<<", ">>")));
        assert_eq!(cli.delay, Some(2.5));
        assert!(cli.once);
    }

    #[test]
    fn test_cli_rejects_bad_brackets() {
        assert!(Cli::try_parse_from(["coconutbar", "--active", "abc"]).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let file = "foreground = \"#abc\"\nbackground = \"#000\"\nactive = \"..\"\n";
        let mut settings = Settings::from_toml(file, Path::new("config.toml")).unwrap();
        // untouched keys keep defaults
        assert_eq!(settings.font, "Helvetica 12 bold");
        assert_eq!(settings.active, BracketPair::new(".", "."));

        let cli = Cli {
            foreground: Some("#fed".to_string()),
            delay: Some(0.5),
            ..Cli::default()
        };
        settings.apply(&cli);
        assert_eq!(settings.foreground, "#fed");
        assert_eq!(settings.background, "#000");
        assert_eq!(settings.delay().unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_file_values() {
        let path = Path::new("config.toml");
        assert!(matches!(
            Settings::from_toml("focused = \"(((\"\n", path),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            Settings::from_toml("delay = \"soon\"\n", path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_validation_errors() {
        let settings = Settings {
            delay: 0.0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidDelay(_))));

        // rounds down to a zero period
        let settings = Settings {
            delay: 1e-12,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidDelay(_))));

        for delay in [1e30, f64::INFINITY, f64::NAN, -1.0] {
            let settings = Settings {
                delay,
                ..Settings::default()
            };
            assert!(matches!(settings.delay(), Err(ConfigError::InvalidDelay(_))));
        }

        let settings = Settings {
            subscribe: "   ".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.subscribe_command(),
            Err(ConfigError::EmptyCommand("subscribe"))
        ));

        let settings = Settings {
            panel: Some("lemonbar -n 'unterminated".to_string()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.panel_command(),
            Err(ConfigError::BadQuoting { what: "panel", .. })
        ));
    }

    #[test]
    fn test_panel_command_gets_font_and_colors() {
        let settings = Settings {
            panel: Some("lemonbar -p -n 'my bar'".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            settings.panel_command().unwrap().unwrap(),
            [
                "lemonbar",
                "-p",
                "-n",
                "my bar",
                "-f",
                "Helvetica 12 bold",
                "-F",
                "#BBB",
                "-B",
                "#112"
            ]
        );
    }

    #[tokio::test]
    async fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "system = \"%CPU\"\ndelay = 3").unwrap();

        let settings = Settings::load(Some(file.path())).await.unwrap();
        assert_eq!(settings.system, "%CPU");
        assert_eq!(settings.delay, 3.0);
    }

    #[tokio::test]
    async fn test_load_missing_explicit_file() {
        let result = Settings::load(Some(Path::new("/nonexistent/coconutbar.toml"))).await;
        assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
    }

    #[test]
    fn test_config_file_path() {
        if let Some(path) = Settings::config_file_path() {
            assert!(path.to_string_lossy().contains("coconutbar"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
