//! Structured analysis of one stored email.
//!
//! Feeds the email's stored headlines, chunked body, and harvested links
//! to the model and decodes the response against the analysis schema.
//! Summaries are kept URL-free; links live only in `relevant_links`.

use crate::PipelineSettings;
use async_trait::async_trait;
use newsbrief_core::error::ToolError;
use newsbrief_core::message::Message;
use newsbrief_core::provider::ProviderRequest;
use newsbrief_core::{Provider, Tool, ToolResult};
use newsbrief_mail::clean_links;
use newsbrief_storage::{AnalysisResult, AnalysisStore, ChunkStore, MetadataStore};
use std::sync::Arc;
use tracing::info;

/// How many chunks of the email body go into the analysis prompt.
const MAX_CONTEXT_CHUNKS: usize = 8;

/// Headline fallback length when the email has no subject.
const HEADLINE_FALLBACK_CHARS: usize = 500;

const ANALYST_PROMPT: &str = "You are a newsletter analyst. Extract the distinct themes from the \
email below. For each theme provide: a short theme label, the key points, a concise summary \
written without any URLs, the relevant links chosen from the provided link list, and a priority \
level of high, medium, or low.";

pub struct AnalyzeEmailTool {
    provider: Arc<dyn Provider>,
    metadata: Arc<MetadataStore>,
    chunks: Arc<ChunkStore>,
    analyses: Arc<AnalysisStore>,
    settings: Arc<PipelineSettings>,
}

impl AnalyzeEmailTool {
    pub fn new(
        provider: Arc<dyn Provider>,
        metadata: Arc<MetadataStore>,
        chunks: Arc<ChunkStore>,
        analyses: Arc<AnalysisStore>,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self {
            provider,
            metadata,
            chunks,
            analyses,
            settings,
        }
    }

    fn fail(&self, reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().to_string(),
            reason: reason.into(),
        }
    }

    /// JSON schema for the structured analysis response.
    fn analysis_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "email_id": { "type": "string" },
                "headline_insights": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "theme": { "type": "string" },
                            "key_points": { "type": "array", "items": { "type": "string" } },
                            "summary": { "type": "string" },
                            "relevant_links": { "type": "array", "items": { "type": "string" } },
                            "priority_level": { "type": "string", "enum": ["high", "medium", "low"] }
                        },
                        "required": ["theme", "key_points", "summary", "relevant_links", "priority_level"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["email_id", "headline_insights"],
            "additionalProperties": false
        })
    }

    /// The headline block for the prompt: the headlines stored at
    /// processing time, or the subject (or a body prefix) when none were
    /// stored.
    fn headline_block(headlines: &[String], subject: &str, body: &str) -> String {
        if !headlines.is_empty() {
            return headlines.join("\n");
        }
        let subject = subject.trim();
        if !subject.is_empty() {
            return subject.to_string();
        }
        body.chars().take(HEADLINE_FALLBACK_CHARS).collect()
    }

    /// Remove raw URLs from a summary so links only appear in
    /// `relevant_links`.
    fn strip_urls(text: &str) -> String {
        text.split_whitespace()
            .filter(|w| !w.starts_with("http://") && !w.starts_with("https://"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Tool for AnalyzeEmailTool {
    fn name(&self) -> &str {
        "analyze_email"
    }

    fn description(&self) -> &str {
        "Analyze one processed email by ID, extracting themed insights with key points, \
         summaries, relevant links, and priority levels. Returns the analysis ID."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "email_id": {
                    "type": "string",
                    "description": "ID of a previously processed email"
                }
            },
            "required": ["email_id"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let email_id = arguments["email_id"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("email_id is required".into()))?;

        let meta = self
            .metadata
            .get(email_id)
            .await
            .map_err(|e| self.fail(e.to_string()))?;

        let chunks = self.chunks.get_chunks(email_id, MAX_CONTEXT_CHUNKS).await;
        let body: String = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let headlines = Self::headline_block(&meta.headlines, &meta.subject, &body);

        let user_prompt = format!(
            "Headlines:\n{headlines}\n\nFrom: {}\n\nAvailable links:\n{}\n\nEmail content:\n{body}",
            meta.sender,
            meta.links.join("\n"),
        );

        let request = ProviderRequest::new(
            self.settings.model.clone(),
            vec![Message::system(ANALYST_PROMPT), Message::user(user_prompt)],
            self.settings.temperature,
        );

        let value = self
            .provider
            .complete_structured(request, "email_analysis", Self::analysis_schema())
            .await
            .map_err(|e| self.fail(e.to_string()))?;

        let mut analysis: AnalysisResult =
            serde_json::from_value(value).map_err(|e| self.fail(format!("Analysis decode: {e}")))?;

        // The model's echo of the id is not trusted.
        analysis.email_id = email_id.to_string();

        for insight in &mut analysis.headline_insights {
            insight.summary = Self::strip_urls(&insight.summary);
            insight.relevant_links = clean_links(&insight.relevant_links);
        }

        let insight_count = analysis.headline_insights.len();
        let analysis_id = self.analyses.store(analysis).await;

        self.metadata
            .set_analysis_id(email_id, &analysis_id)
            .await
            .map_err(|e| self.fail(e.to_string()))?;

        info!(email_id, %analysis_id, insight_count, "Email analyzed");

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format!(
                "Analyzed email {email_id}: {insight_count} insights. Analysis ID: {analysis_id}"
            ),
            data: Some(serde_json::json!({ "analysis_id": analysis_id })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsbrief_core::error::ProviderError;
    use newsbrief_core::provider::ProviderResponse;
    use newsbrief_storage::{EmailMetadata, StoredChunk};

    /// Provider that returns one canned structured value.
    struct CannedProvider {
        value: serde_json::Value,
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }
        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("canned".into()))
        }
        async fn complete_structured(
            &self,
            _request: ProviderRequest,
            _schema_name: &str,
            _schema: serde_json::Value,
        ) -> std::result::Result<serde_json::Value, ProviderError> {
            Ok(self.value.clone())
        }
    }

    fn settings() -> Arc<PipelineSettings> {
        Arc::new(PipelineSettings {
            model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            temperature: 0.0,
            senders: vec![],
            receiver_email: String::new(),
            chunk_size: 512,
            chunk_overlap: 50,
        })
    }

    async fn seed_email(metadata: &MetadataStore, chunks: &ChunkStore, email_id: &str) {
        metadata
            .store(&EmailMetadata {
                email_id: email_id.to_string(),
                subject: "AI News Today".into(),
                sender: "news@alphasignal.ai".into(),
                received_at: "2025-06-01T08:00:00Z".into(),
                chunk_count: 1,
                links: vec!["https://example.com/story".into()],
                headlines: vec!["GPT-5 released".into()],
                analysis_id: None,
                stored_at: String::new(),
            })
            .await
            .unwrap();
        chunks
            .store_chunks(
                email_id,
                vec![StoredChunk {
                    email_id: email_id.to_string(),
                    index: 0,
                    text: "GPT-5 was released today with major improvements.".into(),
                    embedding: None,
                }],
            )
            .await;
    }

    fn canned_analysis() -> serde_json::Value {
        serde_json::json!({
            "email_id": "wrong-id-from-model",
            "headline_insights": [{
                "theme": "Model Releases",
                "key_points": ["GPT-5 released"],
                "summary": "GPT-5 shipped, see https://example.com/story?utm_source=x for details",
                "relevant_links": ["https://Example.com/story?utm_source=x#top"],
                "priority_level": "high"
            }]
        })
    }

    #[tokio::test]
    async fn analyzes_and_stores_result() {
        let metadata = Arc::new(MetadataStore::new("sqlite::memory:").await.unwrap());
        let chunks = Arc::new(ChunkStore::new());
        let analyses = Arc::new(AnalysisStore::new());
        seed_email(&metadata, &chunks, "e1").await;

        let tool = AnalyzeEmailTool::new(
            Arc::new(CannedProvider {
                value: canned_analysis(),
            }),
            metadata.clone(),
            chunks,
            analyses.clone(),
            settings(),
        );

        let result = tool
            .execute(serde_json::json!({"email_id": "e1"}))
            .await
            .unwrap();
        assert!(result.success);

        let analysis_id = result.data.unwrap()["analysis_id"]
            .as_str()
            .unwrap()
            .to_string();
        let stored = analyses.get(&analysis_id).await.unwrap();

        // Model-reported id replaced with the real one
        assert_eq!(stored.email_id, "e1");
        // Summary scrubbed of URLs, links cleaned and normalized
        let insight = &stored.headline_insights[0];
        assert!(!insight.summary.contains("http"));
        assert_eq!(insight.relevant_links, vec!["https://example.com/story"]);

        // Metadata now points at the analysis
        let meta = metadata.get("e1").await.unwrap();
        assert_eq!(meta.analysis_id.as_deref(), Some(analysis_id.as_str()));
    }

    #[tokio::test]
    async fn missing_email_id_is_invalid_arguments() {
        let metadata = Arc::new(MetadataStore::new("sqlite::memory:").await.unwrap());
        let tool = AnalyzeEmailTool::new(
            Arc::new(CannedProvider {
                value: canned_analysis(),
            }),
            metadata,
            Arc::new(ChunkStore::new()),
            Arc::new(AnalysisStore::new()),
            settings(),
        );

        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn unknown_email_is_execution_failure() {
        let metadata = Arc::new(MetadataStore::new("sqlite::memory:").await.unwrap());
        let tool = AnalyzeEmailTool::new(
            Arc::new(CannedProvider {
                value: canned_analysis(),
            }),
            metadata,
            Arc::new(ChunkStore::new()),
            Arc::new(AnalysisStore::new()),
            settings(),
        );

        let err = tool
            .execute(serde_json::json!({"email_id": "ghost"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[test]
    fn headline_block_prefers_stored_headlines() {
        let stored = vec!["First story".to_string(), "Second story".to_string()];
        assert_eq!(
            AnalyzeEmailTool::headline_block(&stored, "Big News", "body text"),
            "First story\nSecond story"
        );
    }

    #[test]
    fn headline_block_falls_back_to_subject() {
        assert_eq!(
            AnalyzeEmailTool::headline_block(&[], "Big News", "body text"),
            "Big News"
        );
    }

    #[test]
    fn headline_block_falls_back_to_body_prefix() {
        let body = "x".repeat(600);
        let block = AnalyzeEmailTool::headline_block(&[], "  ", &body);
        assert_eq!(block.chars().count(), 500);
    }

    #[test]
    fn strip_urls_removes_links_only() {
        let cleaned =
            AnalyzeEmailTool::strip_urls("Read more at https://example.com/a and move on");
        assert_eq!(cleaned, "Read more at and move on");
    }
}
