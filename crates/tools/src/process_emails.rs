//! Fetch newsletter emails and prepare them for analysis.
//!
//! For each fetched email: extract plain text from the HTML body, harvest
//! and clean its links, pull out headlines, chunk the text, embed the
//! chunks, and store both chunks and metadata. Headline extraction and
//! embedding are best-effort; an outage degrades the stored record but
//! does not fail the fetch.

use crate::PipelineSettings;
use async_trait::async_trait;
use newsbrief_core::error::ToolError;
use newsbrief_core::message::Message;
use newsbrief_core::provider::{EmbeddingRequest, ProviderRequest};
use newsbrief_core::{Provider, Tool, ToolResult};
use newsbrief_mail::{GraphMailClient, clean_links, extract_content};
use newsbrief_storage::{ChunkStore, EmailMetadata, MetadataStore, StoredChunk, chunk_text};
use std::sync::Arc;
use tracing::{info, warn};

/// Headline fallback length when the model yields nothing usable.
const HEADLINE_FALLBACK_CHARS: usize = 500;

const HEADLINE_PROMPT: &str = "You extract news headlines from newsletter emails. Reply with \
one headline per line and nothing else.";

pub struct ProcessEmailsTool {
    mail: Arc<GraphMailClient>,
    provider: Arc<dyn Provider>,
    metadata: Arc<MetadataStore>,
    chunks: Arc<ChunkStore>,
    settings: Arc<PipelineSettings>,
}

impl ProcessEmailsTool {
    pub fn new(
        mail: Arc<GraphMailClient>,
        provider: Arc<dyn Provider>,
        metadata: Arc<MetadataStore>,
        chunks: Arc<ChunkStore>,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self {
            mail,
            provider,
            metadata,
            chunks,
            settings,
        }
    }

    fn fail(&self, reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().to_string(),
            reason: reason.into(),
        }
    }

    /// Extract headlines from the email text. Falls back to the subject
    /// (or a body prefix when there is no subject) if the model is
    /// unavailable or returns nothing.
    async fn extract_headlines(&self, subject: &str, text: &str) -> Vec<String> {
        let request = ProviderRequest::new(
            self.settings.model.clone(),
            vec![
                Message::system(HEADLINE_PROMPT),
                Message::user(format!("Subject: {subject}\n\n{text}")),
            ],
            self.settings.temperature,
        );

        match self.provider.complete(request).await {
            Ok(response) => {
                let headlines: Vec<String> = response
                    .message
                    .content
                    .lines()
                    .map(|line| line.trim().trim_start_matches(['-', '*']).trim().to_string())
                    .filter(|line| !line.is_empty())
                    .collect();
                if !headlines.is_empty() {
                    return headlines;
                }
            }
            Err(e) => {
                warn!(error = %e, "Headline extraction failed, using fallback headline");
            }
        }

        let subject = subject.trim();
        if subject.is_empty() {
            vec![text.chars().take(HEADLINE_FALLBACK_CHARS).collect()]
        } else {
            vec![subject.to_string()]
        }
    }

    /// Embed the chunk texts, or return `None` when embedding is
    /// unavailable.
    async fn embed_chunks(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Some(Vec::new());
        }

        let request = EmbeddingRequest {
            model: self.settings.embedding_model.clone(),
            inputs: texts.to_vec(),
        };

        match self.provider.embed(request).await {
            Ok(response) if response.embeddings.len() == texts.len() => Some(response.embeddings),
            Ok(response) => {
                warn!(
                    expected = texts.len(),
                    got = response.embeddings.len(),
                    "Embedding count mismatch, storing chunks without embeddings"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Embedding failed, storing chunks without embeddings");
                None
            }
        }
    }
}

#[async_trait]
impl Tool for ProcessEmailsTool {
    fn name(&self) -> &str {
        "process_emails"
    }

    fn description(&self) -> &str {
        "Fetch recent newsletter emails from the configured senders, extract their content, \
         and store them for analysis. Returns the IDs of the processed emails."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "days_back": {
                    "type": "integer",
                    "description": "How many days back to fetch emails from (default 1)"
                }
            },
            "required": []
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let days_back = arguments["days_back"].as_i64().unwrap_or(1).max(0);

        let emails = self
            .mail
            .fetch_messages(days_back, &self.settings.senders)
            .await
            .map_err(|e| self.fail(e.to_string()))?;

        let mut email_ids = Vec::new();

        for email in &emails {
            let content = extract_content(&email.body_html);
            let links = clean_links(&content.links);
            let headlines = self.extract_headlines(&email.subject, &content.text).await;
            let texts = chunk_text(
                &content.text,
                self.settings.chunk_size,
                self.settings.chunk_overlap,
            );

            let embeddings = self.embed_chunks(&texts).await;

            let stored: Vec<StoredChunk> = texts
                .iter()
                .enumerate()
                .map(|(index, text)| StoredChunk {
                    email_id: email.id.clone(),
                    index,
                    text: text.clone(),
                    embedding: embeddings.as_ref().map(|e| e[index].clone()),
                })
                .collect();

            let chunk_count = stored.len() as i64;
            self.chunks.store_chunks(&email.id, stored).await;

            self.metadata
                .store(&EmailMetadata {
                    email_id: email.id.clone(),
                    subject: email.subject.clone(),
                    sender: email.sender.clone(),
                    received_at: email.received_at.clone(),
                    chunk_count,
                    links,
                    headlines,
                    analysis_id: None,
                    stored_at: String::new(),
                })
                .await
                .map_err(|e| self.fail(e.to_string()))?;

            email_ids.push(email.id.clone());
        }

        info!(count = email_ids.len(), "Processed newsletter emails");

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format!(
                "Processed {} emails. Email IDs: {}",
                email_ids.len(),
                email_ids.join(", ")
            ),
            data: Some(serde_json::json!({ "email_ids": email_ids })),
        })
    }
}
