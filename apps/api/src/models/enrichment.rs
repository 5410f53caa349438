//! Enrichment outputs: what the resume parser and profile scrapers hand back.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One external source that can be derived from an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Resume,
    #[serde(rename = "linkedin")]
    LinkedIn,
    #[serde(rename = "github")]
    GitHub,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Resume, SourceKind::LinkedIn, SourceKind::GitHub];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Resume => "resume",
            SourceKind::LinkedIn => "linkedin",
            SourceKind::GitHub => "github",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub degree: String,
    pub institute: String,
    pub marks_or_cgpa: String,
    pub start: String,
    pub end: String,
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub company: String,
    pub role: String,
    pub description: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub title: String,
    pub tech: Vec<String>,
}

/// Structured resume as returned by the parsing model. Missing sections default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedResume {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub projects: Vec<Project>,
    pub skills: Vec<String>,
}

/// A scraped hosted profile. `data` keeps the scraper payload verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedProfile {
    pub profile_url: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub data: Value,
}

/// A successful enrichment. The variant names the aggregate slot it fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EnrichedRecord {
    Resume(ParsedResume),
    #[serde(rename = "linkedin")]
    LinkedIn(ParsedProfile),
    #[serde(rename = "github")]
    GitHub(ParsedProfile),
}

impl EnrichedRecord {
    pub fn kind(&self) -> SourceKind {
        match self {
            EnrichedRecord::Resume(_) => SourceKind::Resume,
            EnrichedRecord::LinkedIn(_) => SourceKind::LinkedIn,
            EnrichedRecord::GitHub(_) => SourceKind::GitHub,
        }
    }
}
