//! Operator-facing status signal.
//!
//! A status is a `(level, message)` pair published at the end of a
//! reconciliation pass. The local host implementation persists it as a JSON
//! document so `hubkeeper status` can show the most recent one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Waiting,
    Active,
    Error,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Waiting => "waiting",
            StatusLevel::Active => "active",
            StatusLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl Status {
    pub fn waiting(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Waiting,
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }

    pub fn active(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Active,
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_constructors_set_level() {
        assert_eq!(Status::waiting("w").level, StatusLevel::Waiting);
        assert_eq!(Status::active("a").level, StatusLevel::Active);
        assert_eq!(Status::error("e").level, StatusLevel::Error);
    }

    #[test]
    fn test_status_level_serializes_snake_case() {
        let status = Status::waiting("Waiting for a JupyterHub spawner");
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"waiting\""));
        let parsed: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.level, StatusLevel::Waiting);
        assert_eq!(parsed.message, status.message);
    }
}
