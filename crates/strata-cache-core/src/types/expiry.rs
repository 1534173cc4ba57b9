//! Expiry expressions and their normalization to a TTL

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;

use crate::{CacheError, Result};

/// Marker used to carry [`Expiry::Persist`] through a parameter map
pub const PERSIST: &str = "__persist__";

/// Default expiry of adapters that do not configure one
pub const DEFAULT_EXPIRY: &str = "+1 hour";

/// Requested lifetime of a written entry
///
/// An absent expiry (`None` at the call site) means "use the adapter's
/// configured default". `Expiry::default()` is that default when an adapter
/// configures none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// No expiry, kept for as long as the backend cares to
    Persist,
    /// Seconds to live; zero or negative expires immediately
    Seconds(i64),
    /// Relative or absolute time expression, e.g. `"+1 hour"` or `"tomorrow"`
    Expression(String),
}

/// Normalized time-to-live handed to a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Store without expiry
    Persist,
    /// Store for this many seconds; `<= 0` means already expired
    Seconds(i64),
}

impl Ttl {
    /// Duration to hand to a backend, `None` for persistent entries
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Ttl::Persist => None,
            Ttl::Seconds(secs) => Some(Duration::from_secs((*secs).max(0) as u64)),
        }
    }

    /// Whether an entry written with this TTL is dead on arrival
    pub fn is_expired(&self) -> bool {
        matches!(self, Ttl::Seconds(secs) if *secs <= 0)
    }
}

impl Expiry {
    /// Build an expression expiry
    pub fn expression(expr: impl Into<String>) -> Self {
        Expiry::Expression(expr.into())
    }

    /// Normalize against the current time
    pub fn ttl(&self) -> Result<Ttl> {
        self.ttl_at(Utc::now())
    }

    /// Normalize against a fixed point in time
    pub fn ttl_at(&self, now: DateTime<Utc>) -> Result<Ttl> {
        match self {
            Expiry::Persist => Ok(Ttl::Persist),
            Expiry::Seconds(secs) => Ok(Ttl::Seconds(*secs)),
            Expiry::Expression(expr) => {
                let at = parse_time(expr, now)?;
                Ok(Ttl::Seconds((at - now).num_seconds()))
            }
        }
    }

    /// Resolve an optional per-call expiry, falling back to `default`
    pub fn resolve(expiry: Option<&Expiry>, default: &Expiry) -> Result<Ttl> {
        expiry.unwrap_or(default).ttl()
    }

    /// Encode for a parameter map
    pub fn to_value(&self) -> Value {
        match self {
            Expiry::Persist => Value::String(PERSIST.to_string()),
            Expiry::Seconds(secs) => Value::from(*secs),
            Expiry::Expression(expr) => Value::String(expr.clone()),
        }
    }

    /// Decode from a parameter map; `null` and unrecognised shapes are absent
    pub fn from_value(value: &Value) -> Option<Expiry> {
        match value {
            Value::String(s) if s == PERSIST => Some(Expiry::Persist),
            Value::String(s) => Some(Expiry::Expression(s.clone())),
            Value::Number(n) => n.as_i64().map(Expiry::Seconds),
            _ => None,
        }
    }
}

impl Default for Expiry {
    fn default() -> Self {
        Expiry::Expression(DEFAULT_EXPIRY.to_string())
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Expiry::from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "expected seconds, a time expression or `{PERSIST}`, got {value}"
            ))
        })
    }
}

impl From<i64> for Expiry {
    fn from(secs: i64) -> Self {
        Expiry::Seconds(secs)
    }
}

impl From<&str> for Expiry {
    fn from(expr: &str) -> Self {
        Expiry::Expression(expr.to_string())
    }
}

impl From<String> for Expiry {
    fn from(expr: String) -> Self {
        Expiry::Expression(expr)
    }
}

impl From<Duration> for Expiry {
    fn from(ttl: Duration) -> Self {
        Expiry::Seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Number(i64),
    Word(String),
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
        } else if c == '+' || c == '-' || c.is_ascii_digit() {
            let mut digits = String::new();
            digits.push(c);
            chars.next();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            let n = match digits.as_str() {
                "+" | "-" => return Err(CacheError::InvalidExpiry(expr.to_string())),
                s => s
                    .parse::<i64>()
                    .map_err(|_| CacheError::InvalidExpiry(expr.to_string()))?,
            };
            tokens.push(Token::Number(n));
        } else if c.is_alphabetic() {
            let mut word = String::new();
            while let Some(&w) = chars.peek() {
                if !w.is_alphabetic() {
                    break;
                }
                word.extend(w.to_lowercase());
                chars.next();
            }
            tokens.push(Token::Word(word));
        } else {
            return Err(CacheError::InvalidExpiry(expr.to_string()));
        }
    }

    Ok(tokens)
}

enum Unit {
    Seconds(i64),
    Months(i64),
}

fn unit(word: &str) -> Option<Unit> {
    let unit = match word {
        "s" | "sec" | "secs" | "second" | "seconds" => Unit::Seconds(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Unit::Seconds(60),
        "h" | "hour" | "hours" => Unit::Seconds(3_600),
        "d" | "day" | "days" => Unit::Seconds(86_400),
        "w" | "week" | "weeks" => Unit::Seconds(604_800),
        "fortnight" | "fortnights" => Unit::Seconds(1_209_600),
        "month" | "months" => Unit::Months(1),
        "y" | "year" | "years" => Unit::Months(12),
        _ => return None,
    };
    Some(unit)
}

fn at_time(base: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    base.date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|at| at.and_utc())
        .unwrap_or(base)
}

fn parse_absolute(expr: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(expr) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(expr, format) {
            return Some(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(expr, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

/// Parse a time expression into an absolute point in time
///
/// Accepts absolute timestamps (RFC 3339, `YYYY-MM-DD[ HH:MM[:SS]]`, read as
/// UTC) and relative phrases built from `now`, `today`, `midnight`, `noon`,
/// `tomorrow`, `yesterday`, `[+|-]N unit`, `next unit`, `last unit` and a
/// trailing `ago`.
pub fn parse_time(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(CacheError::InvalidExpiry(expr.to_string()));
    }
    if let Some(at) = parse_absolute(trimmed) {
        return Ok(at);
    }

    let invalid = || CacheError::InvalidExpiry(expr.to_string());
    let tokens = tokenize(trimmed)?;
    let mut base = now;
    let mut seconds: i64 = 0;
    let mut months: i64 = 0;
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        let count = match token {
            Token::Number(n) => n,
            Token::Word(word) => match word.as_str() {
                "now" => continue,
                "today" | "midnight" => {
                    base = at_time(base, 0);
                    continue;
                }
                "noon" => {
                    base = at_time(base, 12);
                    continue;
                }
                "tomorrow" => {
                    base = at_time(base, 0) + TimeDelta::days(1);
                    continue;
                }
                "yesterday" => {
                    base = at_time(base, 0) - TimeDelta::days(1);
                    continue;
                }
                "ago" => {
                    seconds = -seconds;
                    months = -months;
                    continue;
                }
                "next" => 1,
                "last" => -1,
                _ => return Err(invalid()),
            },
        };

        match iter.next() {
            Some(Token::Word(word)) => match unit(&word) {
                Some(Unit::Seconds(size)) => {
                    seconds = count
                        .checked_mul(size)
                        .and_then(|delta| seconds.checked_add(delta))
                        .ok_or_else(invalid)?;
                }
                Some(Unit::Months(size)) => {
                    months = count
                        .checked_mul(size)
                        .and_then(|delta| months.checked_add(delta))
                        .ok_or_else(invalid)?;
                }
                None => return Err(invalid()),
            },
            _ => return Err(invalid()),
        }
    }

    let shifted = match months {
        0 => Some(base),
        m if m > 0 => u32::try_from(m)
            .ok()
            .and_then(|m| base.checked_add_months(Months::new(m))),
        m => u32::try_from(-m)
            .ok()
            .and_then(|m| base.checked_sub_months(Months::new(m))),
    };
    shifted
        .and_then(|at| at.checked_add_signed(TimeDelta::try_seconds(seconds)?))
        .ok_or_else(invalid)
}
