//! Flux script primitives.
//!
//! Everything that ends up inside a query script goes through this module:
//! caller-controlled strings are escaped into Flux string literals, and
//! durations are validated literals rather than raw strings. Query builders
//! upstream never concatenate unescaped input.

use crate::error::Error;

/// Escape a raw string for use inside a double-quoted Flux string literal.
///
/// Escapes the backslash and quote characters, control characters with a
/// textual escape, and the `${` interpolation opener so caller input can
/// never be evaluated.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out
}

/// Quote and escape a raw string as a Flux string literal.
pub fn string_literal(raw: &str) -> String {
    format!("\"{}\"", escape(raw))
}

/// A validated Flux duration literal, e.g. `10s`, `24h`, `1h30m`.
///
/// The grammar is one or more `<digits><unit>` groups with units
/// `ms|s|m|h|d|w`; the total must be positive. Because construction
/// validates, a `Duration` can be interpolated into a script verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duration(String);

impl Duration {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let mut rest = raw;
        let mut total_is_zero = true;
        if rest.is_empty() {
            return Err(Error::InvalidDuration(raw.to_string()));
        }
        while !rest.is_empty() {
            let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 {
                return Err(Error::InvalidDuration(raw.to_string()));
            }
            let magnitude: u64 = rest[..digits]
                .parse()
                .map_err(|_| Error::InvalidDuration(raw.to_string()))?;
            if magnitude > 0 {
                total_is_zero = false;
            }
            rest = &rest[digits..];
            rest = if let Some(r) = rest.strip_prefix("ms") {
                r
            } else if let Some(r) = rest
                .strip_prefix('s')
                .or_else(|| rest.strip_prefix('m'))
                .or_else(|| rest.strip_prefix('h'))
                .or_else(|| rest.strip_prefix('d'))
                .or_else(|| rest.strip_prefix('w'))
            {
                r
            } else {
                return Err(Error::InvalidDuration(raw.to_string()));
            };
        }
        if total_is_zero {
            return Err(Error::InvalidDuration(raw.to_string()));
        }
        Ok(Duration(raw.to_string()))
    }

    /// Duration of a whole number of seconds.
    pub fn seconds(secs: u64) -> Self {
        Duration(format!("{secs}s"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Duration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Duration::parse(s)
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
