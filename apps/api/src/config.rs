use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::enrichment::profile::ScraperCredentials;
use crate::pipeline::per_source::WorkerCounts;
use crate::pipeline::DispatchStrategy;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub pipeline: PipelineConfig,
    pub scrapers: ScraperConfig,
}

/// Concurrency and scheduling knobs for processing runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub strategy: DispatchStrategy,
    /// Applicant pool size (per-applicant) or resolution pool size (per-source).
    pub max_workers: usize,
    pub workers: WorkerCounts,
    pub source_timeout: Duration,
    pub queue_idle_timeout: Duration,
    pub polling_interval: Duration,
    pub ranking_top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: DispatchStrategy::default(),
            max_workers: 10,
            workers: WorkerCounts::default(),
            source_timeout: Duration::from_secs(30),
            queue_idle_timeout: Duration::from_secs(5),
            polling_interval: Duration::from_secs(5),
            ranking_top_n: 10,
        }
    }
}

/// Profile scraper endpoints. An unset endpoint disables that source kind.
#[derive(Debug, Clone, Default)]
pub struct ScraperConfig {
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_credentials: Option<ScraperCredentials>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            None => 8080,
        };

        Ok(Config {
            database_url: require(&lookup, "DATABASE_URL")?,
            anthropic_api_key: require(&lookup, "ANTHROPIC_API_KEY")?,
            port,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            pipeline: PipelineConfig::from_lookup(&lookup)?,
            scrapers: ScraperConfig::from_lookup(&lookup),
        })
    }
}

impl PipelineConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = PipelineConfig::default();

        let strategy = match lookup("DISPATCH_STRATEGY") {
            Some(raw) => raw
                .parse::<DispatchStrategy>()
                .map_err(anyhow::Error::msg)
                .context("DISPATCH_STRATEGY must be per_applicant or per_source")?,
            None => defaults.strategy,
        };

        Ok(PipelineConfig {
            strategy,
            max_workers: positive(lookup, "MAX_WORKERS", defaults.max_workers)?,
            workers: WorkerCounts {
                resume: positive(lookup, "RESUME_WORKERS", defaults.workers.resume)?,
                linkedin: positive(lookup, "LINKEDIN_WORKERS", defaults.workers.linkedin)?,
                github: positive(lookup, "GITHUB_WORKERS", defaults.workers.github)?,
            },
            source_timeout: seconds(lookup, "SCRAPER_TIMEOUT", defaults.source_timeout)?,
            queue_idle_timeout: seconds(lookup, "QUEUE_TIMEOUT", defaults.queue_idle_timeout)?,
            polling_interval: seconds(lookup, "POLLING_INTERVAL", defaults.polling_interval)?,
            ranking_top_n: positive(lookup, "RANKING_TOP_N", defaults.ranking_top_n)?,
        })
    }
}

impl ScraperConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let linkedin_credentials = match (non_empty("LINKEDIN_EMAIL"), non_empty("LINKEDIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(ScraperCredentials { email, password }),
            _ => None,
        };
        ScraperConfig {
            linkedin_url: non_empty("LINKEDIN_SCRAPER_URL"),
            github_url: non_empty("GITHUB_SCRAPER_URL"),
            linkedin_credentials,
        }
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<usize>()
        .with_context(|| format!("{key} must be a whole number, got '{raw}'"))?;
    if value == 0 {
        bail!("{key} must be at least 1");
    }
    Ok(value)
}

/// Whole or fractional seconds.
fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Result<Duration> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let secs = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("{key} must be a number of seconds, got '{raw}'"))?;
    if !secs.is_finite() || secs <= 0.0 {
        bail!("{key} must be a positive number of seconds");
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/shortlist"),
        ("ANTHROPIC_API_KEY", "sk-test"),
    ];

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert!(config.scrapers.linkedin_url.is_none());
    }

    #[test]
    fn test_missing_required_variable_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_pipeline_overrides_parse() {
        let lookup = lookup_from(&[
            ("DISPATCH_STRATEGY", "per_source"),
            ("MAX_WORKERS", "4"),
            ("GITHUB_WORKERS", "6"),
            ("SCRAPER_TIMEOUT", "2.5"),
            ("RANKING_TOP_N", "3"),
        ]);
        let pipeline = PipelineConfig::from_lookup(&lookup).unwrap();
        assert_eq!(pipeline.strategy, DispatchStrategy::PerSource);
        assert_eq!(pipeline.max_workers, 4);
        assert_eq!(pipeline.workers.github, 6);
        assert_eq!(pipeline.workers.resume, 3);
        assert_eq!(pipeline.source_timeout, Duration::from_millis(2500));
        assert_eq!(pipeline.ranking_top_n, 3);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = PipelineConfig::from_lookup(&lookup_from(&[("RESUME_WORKERS", "0")])).unwrap_err();
        assert!(err.to_string().contains("RESUME_WORKERS"));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(PipelineConfig::from_lookup(&lookup_from(&[("MAX_WORKERS", "ten")])).is_err());
        assert!(PipelineConfig::from_lookup(&lookup_from(&[("QUEUE_TIMEOUT", "-1")])).is_err());
        assert!(PipelineConfig::from_lookup(&lookup_from(&[("DISPATCH_STRATEGY", "fifo")])).is_err());
    }

    #[test]
    fn test_linkedin_credentials_need_both_parts() {
        let partial = ScraperConfig::from_lookup(&lookup_from(&[("LINKEDIN_EMAIL", "hr@example.com")]));
        assert!(partial.linkedin_credentials.is_none());

        let full = ScraperConfig::from_lookup(&lookup_from(&[
            ("LINKEDIN_EMAIL", "hr@example.com"),
            ("LINKEDIN_PASSWORD", "hunter2"),
            ("GITHUB_SCRAPER_URL", "http://scrapers:9000/github"),
        ]));
        assert!(full.linkedin_credentials.is_some());
        assert_eq!(full.github_url.as_deref(), Some("http://scrapers:9000/github"));
    }
}
