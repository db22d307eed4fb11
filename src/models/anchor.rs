//! Expected root anchor or issuer name

use super::NameFormat;
use crate::utils::ConfigError;
use regex::Regex;

/// How the expected value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Literal,
    Pattern,
}

/// Expected anchor value, compiled once at configuration time
#[derive(Debug, Clone)]
pub struct AnchorSpec {
    value: String,
    pattern: Option<Regex>,
    format: NameFormat,
}

impl AnchorSpec {
    /// An invalid pattern is rejected here, not at match time
    pub fn new(
        value: impl Into<String>,
        mode: MatchMode,
        format: NameFormat,
    ) -> Result<Self, ConfigError> {
        let value = value.into();
        let pattern = match mode {
            MatchMode::Literal => None,
            MatchMode::Pattern => {
                Some(Regex::new(&value).map_err(|e| ConfigError::InvalidPattern {
                    pattern: value.clone(),
                    message: e.to_string(),
                })?)
            }
        };
        Ok(Self {
            value,
            pattern,
            format,
        })
    }

    pub fn literal(value: impl Into<String>, format: NameFormat) -> Self {
        Self {
            value: value.into(),
            pattern: None,
            format,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn mode(&self) -> MatchMode {
        if self.pattern.is_some() {
            MatchMode::Pattern
        } else {
            MatchMode::Literal
        }
    }

    /// Name serialization the candidate must be rendered with
    pub fn format(&self) -> NameFormat {
        self.format
    }

    /// Exact equality in literal mode, unanchored search in pattern mode
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(candidate),
            None => candidate == self.value,
        }
    }
}
