//! Applicant enrichment pipeline.
//!
//! Flow: collector resolves each applicant's sources → a dispatcher fans the requests
//! out over bounded workers → completions land in the [`store::AggregateStore`] →
//! the run hands the drained snapshot to ranking.
//!
//! Two dispatch strategies share the store contract:
//! - [`per_applicant::PerApplicantDispatcher`] bounds concurrency by applicant.
//! - [`per_source::PerSourceDispatcher`] bounds concurrency by source kind.

pub mod collector;
pub mod enricher;
pub mod listener;
pub mod per_applicant;
pub mod per_source;
pub mod ports;
pub mod queue;
pub mod run;
pub mod store;

#[cfg(test)]
pub mod testing;

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::applicant::ApplicantSet;
use crate::models::enrichment::SourceKind;
use crate::pipeline::store::AggregateStore;

/// Counters reported by one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Applicants that reached the store.
    pub resolved: usize,
    /// Applicants dropped because their identity could not be resolved.
    pub skipped: usize,
    pub requests_issued: usize,
    pub enrichment_failures: usize,
}

impl DispatchSummary {
    pub fn merge(&mut self, other: DispatchSummary) {
        self.resolved += other.resolved;
        self.skipped += other.skipped;
        self.requests_issued += other.requests_issued;
        self.enrichment_failures += other.enrichment_failures;
    }
}

/// Fans enrichment work for one posting out over workers and publishes the results
/// into `store`. Returns only after every issued request has completed or failed.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(
        &self,
        applicants: Arc<ApplicantSet>,
        store: Arc<AggregateStore>,
    ) -> DispatchSummary;

    /// Requests waiting per kind. Empty for strategies without queues.
    fn pending(&self) -> BTreeMap<SourceKind, usize> {
        BTreeMap::new()
    }
}

/// Which dispatcher a deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    #[default]
    PerApplicant,
    PerSource,
}

impl FromStr for DispatchStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_applicant" | "pool" | "a" => Ok(Self::PerApplicant),
            "per_source" | "queue" | "b" => Ok(Self::PerSource),
            other => Err(format!("unknown dispatch strategy '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parses_aliases() {
        assert_eq!(
            "per_source".parse::<DispatchStrategy>(),
            Ok(DispatchStrategy::PerSource)
        );
        assert_eq!(
            " Pool ".parse::<DispatchStrategy>(),
            Ok(DispatchStrategy::PerApplicant)
        );
        assert!("round_robin".parse::<DispatchStrategy>().is_err());
    }

    #[test]
    fn test_summary_merge_adds_counters() {
        let mut total = DispatchSummary {
            resolved: 1,
            requests_issued: 2,
            ..Default::default()
        };
        total.merge(DispatchSummary {
            resolved: 1,
            skipped: 1,
            requests_issued: 1,
            enrichment_failures: 1,
        });
        assert_eq!(
            total,
            DispatchSummary {
                resolved: 2,
                skipped: 1,
                requests_issued: 3,
                enrichment_failures: 1,
            }
        );
    }
}
