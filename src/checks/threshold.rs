//! Expiry threshold evaluation
//!
//! Converts a "time remaining" amount into a verdict. The evaluator does not
//! care about units; callers pass days or minutes and pick the wording.

use crate::models::{Status, Verdict};
use crate::utils::ConfigError;

/// Warning and critical bounds in one unit; more remaining time is safer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    warning: i64,
    critical: i64,
}

impl Thresholds {
    /// Rejects the inverted case where warning is below critical
    pub fn new(warning: i64, critical: i64) -> Result<Self, ConfigError> {
        if warning < critical {
            return Err(ConfigError::InvertedThresholds { warning, critical });
        }
        Ok(Self { warning, critical })
    }

    pub fn warning(&self) -> i64 {
        self.warning
    }

    pub fn critical(&self) -> i64 {
        self.critical
    }

    /// Classify `remaining`. Bounds are exclusive: equal to a bound does
    /// not trigger it.
    pub fn classify(&self, remaining: i64) -> Standing {
        if remaining < 0 {
            Standing::Expired {
                elapsed: remaining.unsigned_abs(),
            }
        } else if remaining < self.critical {
            Standing::Critical { remaining }
        } else if remaining < self.warning {
            Standing::Warning { remaining }
        } else {
            Standing::Ok { remaining }
        }
    }
}

/// Where a remaining amount falls relative to the thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Expired { elapsed: u64 },
    Critical { remaining: i64 },
    Warning { remaining: i64 },
    Ok { remaining: i64 },
}

impl Standing {
    pub fn status(&self) -> Status {
        match self {
            Standing::Expired { .. } | Standing::Critical { .. } => Status::Critical,
            Standing::Warning { .. } => Status::Warning,
            Standing::Ok { .. } => Status::Ok,
        }
    }

    /// Verdict using caller-supplied wording for the expired and remaining cases
    pub fn verdict(
        &self,
        expired: impl FnOnce(u64) -> String,
        remaining: impl FnOnce(i64) -> String,
    ) -> Verdict {
        let message = match *self {
            Standing::Expired { elapsed } => expired(elapsed),
            Standing::Critical { remaining: r }
            | Standing::Warning { remaining: r }
            | Standing::Ok { remaining: r } => remaining(r),
        };
        Verdict::new(self.status(), message)
    }
}

/// Unit the remaining amount is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Minutes,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Days => "days",
            TimeUnit::Minutes => "minutes",
        }
    }
}

/// Evaluate `remaining` against the bounds with default wording.
///
/// Inverted bounds yield UNKNOWN without evaluating.
pub fn evaluate(remaining: i64, warning: i64, critical: i64, unit: TimeUnit) -> Verdict {
    match Thresholds::new(warning, critical) {
        Ok(thresholds) => thresholds.classify(remaining).verdict(
            |elapsed| format!("Expired {} {} ago", elapsed, unit.as_str()),
            |left| format!("{} {} left", left, unit.as_str()),
        ),
        Err(e) => Verdict::unknown(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_exclusive() {
        assert_eq!(evaluate(14, 14, 7, TimeUnit::Days).status, Status::Ok);
        assert_eq!(evaluate(7, 14, 7, TimeUnit::Days).status, Status::Warning);
        assert_eq!(evaluate(6, 14, 7, TimeUnit::Days).status, Status::Critical);
        assert_eq!(evaluate(0, 14, 7, TimeUnit::Days).status, Status::Critical);
    }

    #[test]
    fn test_expired_reports_absolute_value() {
        let verdict = evaluate(-1, 5, 2, TimeUnit::Days);
        assert_eq!(verdict.status, Status::Critical);
        assert_eq!(verdict.message, "Expired 1 days ago");

        let verdict = evaluate(-1559, 600, 300, TimeUnit::Minutes);
        assert_eq!(verdict.message, "Expired 1559 minutes ago");
    }

    #[test]
    fn test_inverted_bounds_are_unknown() {
        for remaining in [-10, 0, 3, 100] {
            let verdict = evaluate(remaining, 1, 5, TimeUnit::Days);
            assert_eq!(verdict.status, Status::Unknown);
            assert_eq!(verdict.message, "warning cannot be less than critical");
        }
    }

    #[test]
    fn test_monotonic_in_remaining() {
        for (warning, critical) in [(14, 7), (600, 300), (5, 5), (0, 0)] {
            let mut previous = Status::Ok.severity();
            for remaining in (-5..=700).rev() {
                let severity = evaluate(remaining, warning, critical, TimeUnit::Minutes)
                    .status
                    .severity();
                assert!(severity >= previous, "verdict improved at {}", remaining);
                previous = severity;
            }
        }
    }

    #[test]
    fn test_remaining_amount_in_message() {
        assert_eq!(evaluate(420, 600, 300, TimeUnit::Minutes).message, "420 minutes left");
        assert_eq!(evaluate(30, 14, 7, TimeUnit::Days).message, "30 days left");
    }
}
