//! Resume enrichment: download the document, pull its text, have the model structure it.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::enrichment::prompts::{RESUME_PARSE_PROMPT_TEMPLATE, RESUME_PARSE_SYSTEM};
use crate::llm_client::prompts::NO_INVENTION_INSTRUCTION;
use crate::llm_client::{complete_json, TextModel};
use crate::models::applicant::ApplicantId;
use crate::models::enrichment::{EnrichedRecord, ParsedResume, SourceKind};
use crate::pipeline::enricher::{Enricher, EnrichmentError};

/// Resume text beyond this many characters is not sent to the model.
const MAX_RESUME_CHARS: usize = 40_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

/// Rewrites a Google Drive share link into a direct download link. Other URLs pass
/// through unchanged.
pub fn normalize_drive_url(url: &str) -> String {
    let url = url.trim();
    if !url.contains("drive.google.com") {
        return url.to_string();
    }
    let file_id = url
        .split_once("/d/")
        .map(|(_, rest)| rest)
        .or_else(|| url.split_once("id=").map(|(_, rest)| rest))
        .and_then(|rest| rest.split(['/', '?', '&', '#']).next())
        .filter(|id| !id.is_empty());
    match file_id {
        Some(id) => format!("https://drive.google.com/uc?export=download&id={id}"),
        None => url.to_string(),
    }
}

pub fn detect_format(content_type: Option<&str>, bytes: &[u8]) -> DocumentFormat {
    let declared_pdf = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"));
    if declared_pdf || bytes.starts_with(b"%PDF") {
        DocumentFormat::Pdf
    } else {
        DocumentFormat::Text
    }
}

pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String, EnrichmentError> {
    let text = match format {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| EnrichmentError::Parse(format!("unreadable PDF: {e}")))?,
        DocumentFormat::Text => String::from_utf8(bytes.to_vec())
            .map_err(|_| EnrichmentError::Parse("document is neither PDF nor UTF-8 text".to_string()))?,
    };
    let text = text.trim();
    if text.is_empty() {
        return Err(EnrichmentError::Parse("document contains no text".to_string()));
    }
    Ok(text.chars().take(MAX_RESUME_CHARS).collect())
}

/// [`extract_text`] on the blocking pool, so a caller's timeout can fire while a large
/// PDF is still being decoded.
pub async fn extract_text_blocking(
    bytes: Bytes,
    format: DocumentFormat,
) -> Result<String, EnrichmentError> {
    offload(move || extract_text(&bytes, format)).await
}

async fn offload<T, F>(work: F) -> Result<T, EnrichmentError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EnrichmentError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| EnrichmentError::Parse(format!("text extraction aborted: {e}")))?
}

/// Structures raw resume text with the model.
pub async fn parse_resume_text(
    model: &dyn TextModel,
    text: &str,
) -> Result<ParsedResume, EnrichmentError> {
    let prompt = format!(
        "{}\n{}",
        RESUME_PARSE_PROMPT_TEMPLATE.replace("{resume_text}", text),
        NO_INVENTION_INSTRUCTION
    );
    complete_json(model, &prompt, RESUME_PARSE_SYSTEM)
        .await
        .map_err(|e| EnrichmentError::Parse(e.to_string()))
}

pub struct ResumeEnricher {
    http: Client,
    model: Arc<dyn TextModel>,
}

impl ResumeEnricher {
    pub fn new(http: Client, model: Arc<dyn TextModel>) -> Self {
        Self { http, model }
    }

    async fn download(&self, url: &str) -> Result<(Option<String>, Bytes), EnrichmentError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EnrichmentError::Fetch(e.to_string()))?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| EnrichmentError::Fetch(e.to_string()))?;
        Ok((content_type, bytes))
    }
}

#[async_trait]
impl Enricher for ResumeEnricher {
    fn kind(&self) -> SourceKind {
        SourceKind::Resume
    }

    async fn enrich(
        &self,
        applicant_id: ApplicantId,
        source_url: &str,
    ) -> Result<EnrichedRecord, EnrichmentError> {
        let url = normalize_drive_url(source_url);
        let (content_type, bytes) = self.download(&url).await?;
        let format = detect_format(content_type.as_deref(), &bytes);
        debug!(%applicant_id, ?format, size = bytes.len(), "resume downloaded");

        let text = extract_text_blocking(bytes, format).await?;
        let resume = parse_resume_text(self.model.as_ref(), &text).await?;
        Ok(EnrichedRecord::Resume(resume))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;

    struct Canned(&'static str);

    #[async_trait]
    impl TextModel for Canned {
        async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
            assert!(prompt.contains("Raw resume text"));
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_drive_share_link_becomes_download_link() {
        assert_eq!(
            normalize_drive_url("https://drive.google.com/file/d/1AbC_xyz/view?usp=sharing"),
            "https://drive.google.com/uc?export=download&id=1AbC_xyz"
        );
        assert_eq!(
            normalize_drive_url("https://drive.google.com/open?id=9ZZ&authuser=0"),
            "https://drive.google.com/uc?export=download&id=9ZZ"
        );
    }

    #[test]
    fn test_other_links_pass_through() {
        let url = "https://cdn.example.com/resumes/ayesha.pdf";
        assert_eq!(normalize_drive_url(url), url);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Some("application/pdf"), b""), DocumentFormat::Pdf);
        assert_eq!(detect_format(None, b"%PDF-1.7 ..."), DocumentFormat::Pdf);
        assert_eq!(detect_format(Some("text/plain"), b"Jane Doe"), DocumentFormat::Text);
    }

    #[test]
    fn test_extract_plain_text() {
        let text = extract_text(b"  Jane Doe\nRust engineer  ", DocumentFormat::Text).unwrap();
        assert_eq!(text, "Jane Doe\nRust engineer");
    }

    #[test]
    fn test_extract_rejects_empty_and_binary() {
        assert!(matches!(
            extract_text(b"   ", DocumentFormat::Text),
            Err(EnrichmentError::Parse(_))
        ));
        assert!(matches!(
            extract_text(&[0xff, 0xfe, 0x00], DocumentFormat::Text),
            Err(EnrichmentError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_blocking_extraction_reads_plain_text() {
        let text = extract_text_blocking(Bytes::from_static(b"Jane Doe\n"), DocumentFormat::Text)
            .await
            .unwrap();
        assert_eq!(text, "Jane Doe");
    }

    #[tokio::test]
    async fn test_offloaded_work_does_not_hold_off_timeout() {
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            offload(|| {
                std::thread::sleep(std::time::Duration::from_millis(500));
                Ok(())
            }),
        )
        .await;
        assert!(result.is_err());
        assert!(started.elapsed() < std::time::Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_offload_panic_becomes_parse_error() {
        let result: Result<(), _> = offload(|| panic!("decoder crashed")).await;
        assert!(matches!(result, Err(EnrichmentError::Parse(_))));
    }

    #[tokio::test]
    async fn test_parse_resume_text_reads_model_json() {
        let model = Canned(r#"```json
{"name": "Jane Doe", "skills": ["Rust", "Postgres"], "projects": [{"title": "Queue", "tech": ["tokio"]}]}
```"#);
        let resume = parse_resume_text(&model, "Jane Doe\nRust").await.unwrap();
        assert_eq!(resume.name, "Jane Doe");
        assert_eq!(resume.skills, vec!["Rust", "Postgres"]);
        assert_eq!(resume.projects[0].tech, vec!["tokio"]);
    }

    #[tokio::test]
    async fn test_parse_resume_text_failure_is_parse_error() {
        let model = Canned("Sorry, I can't read that.");
        let result = parse_resume_text(&model, "garbage").await;
        assert!(matches!(result, Err(EnrichmentError::Parse(_))));
    }
}
