//! Log priorities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CacheError;

/// Syslog-style severity of a log message, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Priority {
    /// All priorities, most severe first
    pub const ALL: [Priority; 8] = [
        Priority::Emergency,
        Priority::Alert,
        Priority::Critical,
        Priority::Error,
        Priority::Warning,
        Priority::Notice,
        Priority::Info,
        Priority::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Emergency => "emergency",
            Priority::Alert => "alert",
            Priority::Critical => "critical",
            Priority::Error => "error",
            Priority::Warning => "warning",
            Priority::Notice => "notice",
            Priority::Info => "info",
            Priority::Debug => "debug",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CacheError::Internal(format!("unknown priority `{s}`")))
    }
}

/// Priorities a log configuration accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PrioritySet {
    /// Every priority
    #[default]
    All,
    /// Only the listed priorities
    Only(Vec<Priority>),
}

impl PrioritySet {
    pub fn accepts(&self, priority: Priority) -> bool {
        match self {
            PrioritySet::All => true,
            PrioritySet::Only(list) => list.contains(&priority),
        }
    }

    /// The given priority and everything more severe
    pub fn at_least(priority: Priority) -> Self {
        PrioritySet::Only(
            Priority::ALL
                .into_iter()
                .filter(|p| *p <= priority)
                .collect(),
        )
    }
}

impl From<Priority> for PrioritySet {
    fn from(priority: Priority) -> Self {
        PrioritySet::Only(vec![priority])
    }
}

impl From<Vec<Priority>> for PrioritySet {
    fn from(list: Vec<Priority>) -> Self {
        PrioritySet::Only(list)
    }
}
