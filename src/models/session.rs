use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::StatusFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    Missed,
    Cancelled,
    Waiting,
    Active,
}

impl StatusFilter for SessionStatus {
    const ALL: &'static [Self] = &[
        SessionStatus::Completed,
        SessionStatus::Missed,
        SessionStatus::Cancelled,
        SessionStatus::Waiting,
        SessionStatus::Active,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "completed",
            SessionStatus::Missed => "missed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Active => "active",
        }
    }
}

/// A booked training session between a user and a trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSession {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub trainer_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub cancelled_by: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}
