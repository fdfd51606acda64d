use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Telegram username as stored in the database: no leading `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsernameError {
    #[error("username is empty")]
    Empty,
    #[error("username must not contain whitespace: {0:?}")]
    Whitespace(String),
}

impl Username {
    /// Accepts `alice` or `@alice`; surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, UsernameError> {
        let trimmed = raw.trim();
        let bare = trimmed.strip_prefix('@').unwrap_or(trimmed);
        if bare.is_empty() {
            return Err(UsernameError::Empty);
        }
        if bare.chars().any(char::is_whitespace) {
            return Err(UsernameError::Whitespace(bare.to_string()));
        }
        Ok(Username(bare.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `@alice`, the form Telegram uses to address a user.
    pub fn mention(&self) -> String {
        format!("@{}", self.0)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Username {
    type Err = UsernameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Username::parse(s)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub username: String,
    pub score: i32,
}

/// One recorded task completion as the report sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub description: String,
    pub points: i32,
    pub recorded_at: DateTime<Utc>,
    pub mentor: Option<String>,
}
