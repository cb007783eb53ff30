//! Retention strategies

use std::fmt;

use serde::Serialize;

use crate::error::RetentionError;

/// Names accepted by `RetentionStrategy::from_name`
pub const STRATEGY_NAMES: &[&str] = &["smart", "all", "failures", "latest-n", "daily", "changes"];

/// Which executions of a journey are worth persisting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionStrategy {
    /// Latest success plus one exemplar per distinct failure
    #[default]
    Smart,
    /// Everything
    All,
    /// One exemplar per distinct failure, no successes
    Failures,
    /// The N most recent executions
    LatestN(usize),
    /// First execution per calendar window
    Daily { window_days: u32 },
    /// Executions whose pass/fail state differs from the previous kept one
    Changes,
}

impl RetentionStrategy {
    /// Resolve a configured strategy name. Parameters are only consulted by
    /// the strategies that use them.
    pub fn from_name(
        name: &str,
        latest_n: usize,
        daily_window_days: u32,
    ) -> Result<Self, RetentionError> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "smart" => Ok(Self::Smart),
            "all" => Ok(Self::All),
            "failures" => Ok(Self::Failures),
            "latest-n" | "latest" => Ok(Self::LatestN(latest_n)),
            "daily" => Ok(Self::Daily {
                window_days: daily_window_days,
            }),
            "changes" => Ok(Self::Changes),
            _ => Err(RetentionError::UnknownStrategy(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::All => "all",
            Self::Failures => "failures",
            Self::LatestN(_) => "latest-n",
            Self::Daily { .. } => "daily",
            Self::Changes => "changes",
        }
    }

    /// Strategies whose decisions depend on arrival order
    pub fn requires_ordering(&self) -> bool {
        matches!(
            self,
            Self::LatestN(_) | Self::Daily { .. } | Self::Changes
        )
    }
}

impl fmt::Display for RetentionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestN(n) => write!(f, "latest-n ({})", n),
            Self::Daily { window_days: 1 } => f.write_str("daily"),
            Self::Daily { window_days } => write!(f, "daily ({} days)", window_days),
            other => f.write_str(other.name()),
        }
    }
}
