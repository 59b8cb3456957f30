pub mod progress;
pub mod store;
pub mod strategy;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum GoalsError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for GoalsError {
    fn from(err: diesel::result::Error) -> Self {
        GoalsError::Database(err.to_string())
    }
}

/// How an objective's progress value is derived.
///
/// `Manual` is the fallback for unrecognized stored values so that a
/// corrupt row is never overwritten by recalculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    Manual,
    KeyResults,
    SubObjectives,
    Projects,
}

impl ProgressSource {
    pub fn from_str(s: &str) -> Self {
        match s {
            "key_results" => Self::KeyResults,
            "sub_objectives" => Self::SubObjectives,
            "projects" => Self::Projects,
            _ => Self::Manual,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::KeyResults => "key_results",
            Self::SubObjectives => "sub_objectives",
            Self::Projects => "projects",
        }
    }
}

/// Append-only audit record of a key result's value change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResultUpdate {
    pub id: Uuid,
    pub key_result_id: Uuid,
    pub author_id: Uuid,
    pub previous_value: f64,
    pub new_value: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
