use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a row in `ranking_requests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RankingRequestRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub status: Option<String>,
    pub result: Option<Value>,
    pub requested_via: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// One evaluation as returned by the ranking model. Keys follow the model's output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedApplicant {
    #[serde(rename = "applicantID")]
    pub applicant_id: String,
    #[serde(rename = "applicantName", default)]
    pub applicant_name: String,
    #[serde(rename = "Score")]
    pub score: f64,
    #[serde(rename = "Justification/Recommendation Note", default)]
    pub note: String,
    #[serde(rename = "Key Strengths", default)]
    pub key_strengths: Vec<String>,
    #[serde(rename = "Development Areas", default)]
    pub development_areas: Vec<String>,
    #[serde(rename = "Hiring Recommendation", default)]
    pub hiring_recommendation: String,
}

/// A persisted shortlist position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub applicant_id: String,
    #[serde(default)]
    pub applicant_name: String,
    pub score: f64,
    pub rank: usize,
    pub note: String,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub development_areas: Vec<String>,
    #[serde(default)]
    pub hiring_recommendation: String,
}
