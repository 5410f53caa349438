//! Ranking: projects drained aggregates into model input and turns the model's
//! evaluations into a persisted shortlist.

pub mod llm;
pub mod prompts;

use serde::{Deserialize, Serialize};

use crate::models::aggregate::PartialApplicantRecord;
use crate::models::enrichment::{Education, Experience, Project};
use crate::models::ranking::{RankedApplicant, ShortlistEntry};

/// What the ranking model sees for one applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingCandidate {
    #[serde(rename = "applicantID")]
    pub applicant_id: String,
    #[serde(rename = "applicantName")]
    pub applicant_name: String,
    pub skills: Vec<String>,
    pub matched_skills: Vec<String>,
    pub about: String,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub projects: Vec<Project>,
}

impl From<&PartialApplicantRecord> for RankingCandidate {
    fn from(record: &PartialApplicantRecord) -> Self {
        let resume = record.resume_info.as_ref();
        Self {
            applicant_id: record.identity.id.to_string(),
            applicant_name: record.identity.name.clone(),
            skills: record.fields.skills.clone().unwrap_or_default(),
            matched_skills: record.fields.matched_skills.clone().unwrap_or_default(),
            about: record.fields.about.join("\n"),
            education: resume.map(|r| r.education.clone()).unwrap_or_default(),
            experience: resume.map(|r| r.experience.clone()).unwrap_or_default(),
            projects: resume.map(|r| r.projects.clone()).unwrap_or_default(),
        }
    }
}

/// Sorts by score (highest first), keeps `top_n` and assigns 1-based ranks.
/// Ties keep the model's order.
pub fn shortlist(mut ranked: Vec<RankedApplicant>, top_n: usize) -> Vec<ShortlistEntry> {
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(idx, applicant)| ShortlistEntry {
            applicant_id: applicant.applicant_id,
            applicant_name: applicant.applicant_name,
            score: applicant.score,
            rank: idx + 1,
            note: applicant.note,
            key_strengths: applicant.key_strengths,
            development_areas: applicant.development_areas,
            hiring_recommendation: applicant.hiring_recommendation,
        })
        .collect()
}
