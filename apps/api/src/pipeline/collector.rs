//! Source Collector: resolves one applicant's enrichment requests and side fields
//! from their registration and application documents.
//!
//! Precedence table (scalar fields are overridden, never merged):
//!
//! | field            | registration | application | winner                         |
//! |------------------|--------------|-------------|--------------------------------|
//! | resume URL       | yes          | yes         | application, else registration |
//! | LinkedIn URL     | yes          | yes         | application, else registration |
//! | GitHub URL       | yes          | yes         | application, else registration |
//! | skills           | yes          | no          | registration                   |
//! | matched skills   | no           | yes         | application                    |
//! | about            | yes          | intern only | registration fragments, then interests |
//! | cover letter     | no           | job only    | application                    |
//! | work experience  | no           | job only    | application                    |
//!
//! Blank strings count as absent everywhere.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::aggregate::{CollectedFields, PartialApplicantRecord};
use crate::models::applicant::{
    ApplicantId, ApplicantIdentity, ApplicationKind, ApplicationRecord, RegistrationRecord,
};
use crate::models::enrichment::SourceKind;

/// One unit of enrichment work. Consumed exactly once by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub applicant_id: ApplicantId,
    pub kind: SourceKind,
    pub source_url: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectError {
    #[error("applicant '{name}' has no resolvable id")]
    MissingIdentity { name: String },
}

/// Source URLs after applying the precedence table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSources {
    pub resume: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
}

impl ResolvedSources {
    pub fn get(&self, kind: SourceKind) -> Option<&str> {
        match kind {
            SourceKind::Resume => self.resume.as_deref(),
            SourceKind::LinkedIn => self.linkedin.as_deref(),
            SourceKind::GitHub => self.github.as_deref(),
        }
    }
}

/// Output of [`collect`]: the requests to schedule plus the shell fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedApplicant {
    pub identity: ApplicantIdentity,
    pub requests: Vec<EnrichmentRequest>,
    pub fields: CollectedFields,
}

impl CollectedApplicant {
    pub fn request(&self, kind: SourceKind) -> Option<&EnrichmentRequest> {
        self.requests.iter().find(|r| r.kind == kind)
    }

    pub fn requested_kinds(&self) -> BTreeSet<SourceKind> {
        self.requests.iter().map(|r| r.kind).collect()
    }

    /// The aggregate record as it looks before any enrichment completes.
    pub fn shell(&self) -> PartialApplicantRecord {
        PartialApplicantRecord::shell(
            self.identity.clone(),
            self.fields.clone(),
            self.requested_kinds(),
        )
    }
}

/// Resolves an applicant against the posting's documents.
///
/// A missing registration or application is not an error: the applicant comes back
/// with no requests and empty fields so it still reaches ranking as a shell.
pub fn collect(
    identity: &ApplicantIdentity,
    applications: &[ApplicationRecord],
    registrations: &[RegistrationRecord],
) -> Result<CollectedApplicant, CollectError> {
    if identity.id.is_nil() {
        return Err(CollectError::MissingIdentity {
            name: identity.name.clone(),
        });
    }

    // Later documents win when an applicant has several, matching sequential reassignment.
    let registration = registrations
        .iter()
        .rev()
        .find(|r| r.owner == Some(identity.id));
    let application = applications
        .iter()
        .rev()
        .find(|a| a.user_id == Some(identity.id));

    let sources = merge_sources(registration, application);
    let requests = SourceKind::ALL
        .into_iter()
        .filter_map(|kind| {
            sources.get(kind).map(|url| EnrichmentRequest {
                applicant_id: identity.id,
                kind,
                source_url: url.to_string(),
            })
        })
        .collect();

    Ok(CollectedApplicant {
        identity: identity.clone(),
        requests,
        fields: collect_fields(registration, application),
    })
}

/// Applies the URL rows of the precedence table.
pub fn merge_sources(
    registration: Option<&RegistrationRecord>,
    application: Option<&ApplicationRecord>,
) -> ResolvedSources {
    ResolvedSources {
        resume: prefer(
            application.and_then(|a| present(&a.resume)),
            registration.and_then(|r| present(&r.resume)),
        ),
        linkedin: prefer(
            application.and_then(|a| present(&a.linkedin)),
            registration.and_then(|r| present(&r.linkedin)),
        ),
        github: prefer(
            application.and_then(|a| present(&a.github)),
            registration.and_then(|r| present(&r.github)),
        ),
    }
}

fn collect_fields(
    registration: Option<&RegistrationRecord>,
    application: Option<&ApplicationRecord>,
) -> CollectedFields {
    let mut fields = CollectedFields::default();

    if let Some(reg) = registration {
        fields.skills = reg.skills.clone();
        fields.about.extend(
            [&reg.explain_yourself, &reg.passion, &reg.expectations]
                .into_iter()
                .filter_map(present)
                .map(String::from),
        );
    }

    if let Some(app) = application {
        fields.matched_skills = app.skill_matches.clone();
        match app.kind() {
            ApplicationKind::Intern => {
                if let Some(interests) = present(&app.interests) {
                    fields.about.push(interests.to_string());
                }
            }
            ApplicationKind::Job => {
                fields.cover_letter = present(&app.cover_letter).map(String::from);
                fields.work_experience = app.work_experience.clone().filter(|v| !v.is_null());
            }
            ApplicationKind::Other => {}
        }
    }

    fields
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn prefer(overriding: Option<&str>, base: Option<&str>) -> Option<String> {
    overriding.or(base).map(String::from)
}
