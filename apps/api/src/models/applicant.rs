use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

pub type ApplicantId = Uuid;

/// Who an applicant is, as read from the system of record. Never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantIdentity {
    pub id: ApplicantId,
    pub name: String,
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct RegistrationRecord {
    pub id: Uuid,
    pub owner: Option<ApplicantId>,
    pub resume: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub skills: Option<Vec<String>>,
    pub explain_yourself: Option<String>,
    pub passion: Option<String>,
    pub expectations: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Option<ApplicantId>,
    pub registration_id: Option<Uuid>,
    pub application_type: Option<String>,
    pub resume: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub skill_matches: Option<Vec<String>>,
    pub interests: Option<String>,
    pub cover_letter: Option<String>,
    pub work_experience: Option<Value>,
    pub status: Option<String>,
}

/// The application flavours that carry type-specific fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationKind {
    Job,
    Intern,
    Other,
}

impl ApplicationRecord {
    pub fn kind(&self) -> ApplicationKind {
        match self.application_type.as_deref().map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("job") => ApplicationKind::Job,
            Some(t) if t.eq_ignore_ascii_case("intern") => ApplicationKind::Intern,
            _ => ApplicationKind::Other,
        }
    }
}

/// Status written back onto an applicant's application while a posting is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    UnderReview,
    Done,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::Done => "Done",
        }
    }
}

/// Everything read for one posting: applications, the applicants behind them and
/// their registrations.
#[derive(Debug, Clone, Default)]
pub struct ApplicantSet {
    pub applications: Vec<ApplicationRecord>,
    pub users: Vec<ApplicantIdentity>,
    pub registrations: Vec<RegistrationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub details: Option<Value>,
}
