//! bspwm report parsing
//!
//! `bspc subscribe` prints one report per state change, e.g.
//! `WMeDP-1:OI:oII:fIII:LT:TT:G`. Each line is a complete picture of the
//! desktops, so nothing is carried over between lines.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Layout code of the monocle layout
pub const MONOCLE: &str = "M";

/// Desktop state from its report letter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// `F` / `O`
    Focused,
    /// `o`: occupied, not focused
    Active,
    /// `u` / `U`
    Urgent,
    /// `f`
    Empty,
}

impl SlotState {
    fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'F' | 'O' => Some(SlotState::Focused),
            'o' => Some(SlotState::Active),
            'f' => Some(SlotState::Empty),
            'u' | 'U' => Some(SlotState::Urgent),
            _ => None,
        }
    }
}

/// One desktop of the latest report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSlot {
    pub id: String,
    pub state: SlotState,
    pub is_fullscreen_layout: bool,
}

/// Left/right decoration around a desktop name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BracketPair {
    pub left: String,
    pub right: String,
}

impl BracketPair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn wrap(&self, id: &str) -> String {
        format!("{}{}{}", self.left, id, self.right)
    }
}

impl FromStr for BracketPair {
    type Err = ConfigError;

    /// `"()"` or `"<< >>"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((left, right)) = s.split_once(' ') {
            if !left.is_empty() && !right.is_empty() && !right.contains(' ') {
                return Ok(Self::new(left, right));
            }
        }
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(left), Some(right), None) => Ok(Self::new(left, right)),
            _ => Err(ConfigError::InvalidBrackets(s.to_string())),
        }
    }
}

impl TryFrom<String> for BracketPair {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BracketPair> for String {
    fn from(pair: BracketPair) -> Self {
        pair.to_string()
    }
}

impl fmt::Display for BracketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.left.chars().count() == 1 && self.right.chars().count() == 1 {
            write!(f, "{}{}", self.left, self.right)
        } else {
            write!(f, "{} {}", self.left, self.right)
        }
    }
}

/// Bracket pairs per rendering class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorations {
    pub focused: BracketPair,
    pub fullscreen: BracketPair,
    pub active: BracketPair,
}

impl Default for Decorations {
    fn default() -> Self {
        Self {
            focused: BracketPair::new("(", ")"),
            fullscreen: BracketPair::new("[", "]"),
            active: BracketPair::new("-", "-"),
        }
    }
}

/// Split a report into desktop slots, in report order.
///
/// The monitor token is skipped. The layout is the last `L<code>` token,
/// i.e. the last monitor's layout on multi-monitor reports.
pub fn parse_report(line: &str) -> Vec<WorkspaceSlot> {
    let line = line.trim_end_matches(['\n', '\r']);
    let tokens: Vec<&str> = line.split(':').skip(1).collect();

    let fullscreen = tokens
        .iter()
        .rev()
        .filter_map(|t| t.strip_prefix('L'))
        .find(|code| !code.is_empty())
        .is_some_and(|code| code == MONOCLE);

    tokens
        .iter()
        .filter_map(|token| {
            let mut chars = token.chars();
            let state = SlotState::from_tag(chars.next()?)?;
            Some(WorkspaceSlot {
                id: chars.as_str().to_string(),
                state,
                is_fullscreen_layout: fullscreen,
            })
        })
        .collect()
}

/// Turns report lines into the right-hand summary
#[derive(Debug, Clone, Default)]
pub struct WorkspaceEventParser {
    decorations: Decorations,
}

impl WorkspaceEventParser {
    pub fn new(decorations: Decorations) -> Self {
        Self { decorations }
    }

    pub fn summarize(&self, line: &str) -> String {
        self.render(&parse_report(line))
    }

    /// Urgent desktops are not shown
    pub fn render(&self, slots: &[WorkspaceSlot]) -> String {
        slots
            .iter()
            .filter_map(|slot| {
                let d = &self.decorations;
                match slot.state {
                    SlotState::Focused if slot.is_fullscreen_layout => {
                        Some(d.fullscreen.wrap(&slot.id))
                    }
                    SlotState::Focused => Some(d.focused.wrap(&slot.id)),
                    SlotState::Active => Some(d.active.wrap(&slot.id)),
                    SlotState::Empty => Some(format!(" {} ", slot.id)),
                    SlotState::Urgent => None,
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
