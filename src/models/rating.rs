//! External TLS rating models

use crate::utils::ConfigError;
use serde::Serialize;
use std::str::FromStr;

/// Grades reported by the rating service, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    APlus,
    A,
    AMinus,
    B,
    C,
    D,
    E,
    F,
    /// Certificate not trusted
    T,
    /// Certificate name mismatch
    M,
}

impl Grade {
    pub const ALL: [Grade; 10] = [
        Grade::APlus,
        Grade::A,
        Grade::AMinus,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::E,
        Grade::F,
        Grade::T,
        Grade::M,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
            Grade::T => "T",
            Grade::M => "M",
        }
    }

    /// Position in the total order; a higher rank is a worse grade
    pub fn rank(&self) -> usize {
        *self as usize
    }
}

impl FromStr for Grade {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .iter()
            .find(|g| g.as_str() == s.trim())
            .copied()
            .ok_or_else(|| ConfigError::InvalidGrade {
                grade: s.to_string(),
            })
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote analysis job state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Ready,
    Error,
}

/// Snapshot of the remote job, replaced on every poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingJob {
    pub status: JobStatus,
    /// Raw grade per endpoint; endpoints without a grade are omitted
    pub grades: Vec<String>,
    /// Server's estimate of seconds until the job completes
    pub eta_secs: Option<i64>,
}

impl RatingJob {
    /// Worst grade across all endpoints, or `None` when nothing was rated
    pub fn worst_grade(&self) -> Result<Option<Grade>, String> {
        let mut worst: Option<Grade> = None;
        for raw in &self.grades {
            let grade = raw.parse::<Grade>().map_err(|_| raw.clone())?;
            worst = Some(worst.map_or(grade, |w| w.max(grade)));
        }
        Ok(worst)
    }
}
