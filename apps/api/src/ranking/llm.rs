//! Ranking backed by the shared LLM client.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::llm_client::{complete_json, TextModel};
use crate::models::applicant::JobPosting;
use crate::models::ranking::RankedApplicant;
use crate::pipeline::ports::{RankingClient, RankingError};
use crate::ranking::prompts::{RANKING_PROMPT_TEMPLATE, RANKING_SYSTEM};
use crate::ranking::RankingCandidate;

pub struct LlmRankingClient {
    model: Arc<dyn TextModel>,
}

impl LlmRankingClient {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }
}

pub fn build_prompt(
    posting: &JobPosting,
    candidates: &[RankingCandidate],
) -> Result<String, RankingError> {
    let job_post = json!({
        "title": posting.title,
        "description": posting.description,
        "details": posting.details,
    });
    let job_post = serde_json::to_string_pretty(&job_post)
        .map_err(|e| RankingError::InvalidResponse(e.to_string()))?;
    let applicants = serde_json::to_string_pretty(candidates)
        .map_err(|e| RankingError::InvalidResponse(e.to_string()))?;
    Ok(RANKING_PROMPT_TEMPLATE
        .replace("{job_post}", &job_post)
        .replace("{applicants}", &applicants))
}

#[async_trait]
impl RankingClient for LlmRankingClient {
    async fn rank(
        &self,
        posting: &JobPosting,
        candidates: &[RankingCandidate],
    ) -> Result<Vec<RankedApplicant>, RankingError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = build_prompt(posting, candidates)?;
        let ranked: Vec<RankedApplicant> = complete_json(self.model.as_ref(), &prompt, RANKING_SYSTEM)
            .await
            .map_err(|e| RankingError::Llm(e.to_string()))?;

        // Evaluations for ids that were never submitted are dropped.
        let known: HashSet<&str> = candidates.iter().map(|c| c.applicant_id.as_str()).collect();
        let (kept, unknown): (Vec<_>, Vec<_>) = ranked
            .into_iter()
            .partition(|r| known.contains(r.applicant_id.as_str()));
        if !unknown.is_empty() {
            warn!(count = unknown.len(), "ranking model returned unknown applicant ids");
        }
        info!(
            post_id = %posting.id,
            submitted = candidates.len(),
            evaluated = kept.len(),
            "ranking received"
        );
        Ok(kept)
    }
}
