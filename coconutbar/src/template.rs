//! `--system` format strings
//!
//! A template is literal text with `%CPU`, `%RAM`, `%TEMP`, `%IP`, `%UP` and
//! `%DOWN` placeholders. Matching is a plain prefix test at each `%`, so
//! `%CPUX` renders as the CPU value followed by `X`.

use crate::metrics::{NetRates, Telemetry};

/// A metric slot in a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Cpu,
    Ram,
    Temp,
    Ip,
    Up,
    Down,
}

impl Placeholder {
    pub const ALL: [Placeholder; 6] = [
        Placeholder::Cpu,
        Placeholder::Ram,
        Placeholder::Temp,
        Placeholder::Ip,
        Placeholder::Up,
        Placeholder::Down,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Cpu => "%CPU",
            Placeholder::Ram => "%RAM",
            Placeholder::Temp => "%TEMP",
            Placeholder::Ip => "%IP",
            Placeholder::Up => "%UP",
            Placeholder::Down => "%DOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// Parsed format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(ch) = rest.chars().next() {
            let field = if ch == '%' {
                Placeholder::ALL
                    .into_iter()
                    .find(|p| rest.starts_with(p.token()))
            } else {
                None
            };

            match field {
                Some(placeholder) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(placeholder));
                    rest = &rest[placeholder.token().len()..];
                }
                None => {
                    literal.push(ch);
                    rest = &rest[ch.len_utf8()..];
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Field(p) if *p == placeholder))
    }

    /// Substitute current values, sampling only what the template shows
    pub fn render<T: Telemetry + ?Sized>(&self, telemetry: &mut T) -> String {
        let ip = self.uses(Placeholder::Ip).then(|| telemetry.ip());
        let cpu = self
            .uses(Placeholder::Cpu)
            .then(|| telemetry.cpu().to_string());
        let ram = self
            .uses(Placeholder::Ram)
            .then(|| telemetry.memory().to_string());
        let temp = self
            .uses(Placeholder::Temp)
            .then(|| telemetry.temperature().to_string());
        let (up, down) = if self.uses(Placeholder::Up) || self.uses(Placeholder::Down) {
            match telemetry.network().get() {
                Some(rates) => (
                    NetRates::format_rate(rates.up_mbs),
                    NetRates::format_rate(rates.down_mbs),
                ),
                None => ("NaN".to_string(), "NaN".to_string()),
            }
        } else {
            (String::new(), String::new())
        };

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(placeholder) => out.push_str(match placeholder {
                    Placeholder::Ip => ip.as_deref().unwrap_or_default(),
                    Placeholder::Cpu => cpu.as_deref().unwrap_or_default(),
                    Placeholder::Ram => ram.as_deref().unwrap_or_default(),
                    Placeholder::Temp => temp.as_deref().unwrap_or_default(),
                    Placeholder::Up => up.as_str(),
                    Placeholder::Down => down.as_str(),
                }),
            }
        }
        out
    }
}

/// One-shot parse and render
pub fn render<T: Telemetry + ?Sized>(template: &str, telemetry: &mut T) -> String {
    Template::parse(template).render(telemetry)
}
