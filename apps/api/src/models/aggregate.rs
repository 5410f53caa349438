//! The per-applicant aggregate assembled during a processing run.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::applicant::ApplicantIdentity;
use crate::models::enrichment::{EnrichedRecord, ParsedProfile, ParsedResume, SourceKind};

/// Fields resolved from registration and application documents, before any enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedFields {
    pub skills: Option<Vec<String>>,
    pub matched_skills: Option<Vec<String>>,
    /// Non-empty fragments only, in source order.
    pub about: Vec<String>,
    pub cover_letter: Option<String>,
    pub work_experience: Option<Value>,
}

/// Merged multi-source view of one applicant.
///
/// The three `*_info` slots stay `None` until their enrichment succeeds. `requested`
/// records which kinds were ever scheduled, so a `None` slot can be read as either
/// "no source available" (kind absent) or "scheduled but failed" (kind present).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialApplicantRecord {
    pub identity: ApplicantIdentity,
    #[serde(flatten)]
    pub fields: CollectedFields,
    pub requested: BTreeSet<SourceKind>,
    pub resume_info: Option<ParsedResume>,
    pub linkedin_info: Option<ParsedProfile>,
    pub github_info: Option<ParsedProfile>,
}

/// Why a slot write was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRejection {
    NotScheduled,
    AlreadyWritten,
}

impl PartialApplicantRecord {
    pub fn shell(
        identity: ApplicantIdentity,
        fields: CollectedFields,
        requested: BTreeSet<SourceKind>,
    ) -> Self {
        Self {
            identity,
            fields,
            requested,
            resume_info: None,
            linkedin_info: None,
            github_info: None,
        }
    }

    pub fn is_filled(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Resume => self.resume_info.is_some(),
            SourceKind::LinkedIn => self.linkedin_info.is_some(),
            SourceKind::GitHub => self.github_info.is_some(),
        }
    }

    pub fn filled_kinds(&self) -> BTreeSet<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|kind| self.is_filled(*kind))
            .collect()
    }

    /// Fills the slot named by `value`. A slot is written at most once and only for
    /// a kind that was scheduled.
    pub fn fill(&mut self, value: EnrichedRecord) -> Result<(), SlotRejection> {
        let kind = value.kind();
        if !self.requested.contains(&kind) {
            return Err(SlotRejection::NotScheduled);
        }
        if self.is_filled(kind) {
            return Err(SlotRejection::AlreadyWritten);
        }
        match value {
            EnrichedRecord::Resume(resume) => self.resume_info = Some(resume),
            EnrichedRecord::LinkedIn(profile) => self.linkedin_info = Some(profile),
            EnrichedRecord::GitHub(profile) => self.github_info = Some(profile),
        }
        Ok(())
    }

    /// Replaces base fields with `incoming`'s, keeping any slot already filled here
    /// that `incoming` leaves empty.
    pub fn absorb(&mut self, incoming: PartialApplicantRecord) {
        let PartialApplicantRecord {
            identity,
            fields,
            requested,
            resume_info,
            linkedin_info,
            github_info,
        } = incoming;
        self.identity = identity;
        self.fields = fields;
        self.requested.extend(requested);
        if resume_info.is_some() {
            self.resume_info = resume_info;
        }
        if linkedin_info.is_some() {
            self.linkedin_info = linkedin_info;
        }
        if github_info.is_some() {
            self.github_info = github_info;
        }
    }
}
