//! Digest synthesis.
//!
//! Combines stored analyses (all of them, or a requested subset by
//! analysis id) into one HTML digest. When chunk
//! embeddings are available, the highest-similarity chunks for the digest
//! focus are added as supporting context.

use crate::PipelineSettings;
use async_trait::async_trait;
use newsbrief_core::error::ToolError;
use newsbrief_core::message::Message;
use newsbrief_core::provider::{EmbeddingRequest, ProviderRequest};
use newsbrief_core::{Provider, Tool, ToolResult};
use newsbrief_storage::{AnalysisResult, AnalysisStore, ChunkStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Supporting chunks retrieved for the digest prompt.
const RETRIEVAL_LIMIT: usize = 5;

const WRITER_PROMPT: &str = "You are a newsletter digest writer. Combine the analyses below into \
a single well-organized HTML digest. Group insights by theme across emails, lead with \
high-priority items, keep each item tight, and attach the relevant links as anchors. Output \
only the HTML body.";

pub struct SynthesizeDigestTool {
    provider: Arc<dyn Provider>,
    chunks: Arc<ChunkStore>,
    analyses: Arc<AnalysisStore>,
    settings: Arc<PipelineSettings>,
}

impl SynthesizeDigestTool {
    pub fn new(
        provider: Arc<dyn Provider>,
        chunks: Arc<ChunkStore>,
        analyses: Arc<AnalysisStore>,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self {
            provider,
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

    /// Render the analyses as prompt context.
    fn render_analyses(analyses: &[AnalysisResult]) -> String {
        let mut out = String::new();
        for analysis in analyses {
            out.push_str(&format!("Email {}\n", analysis.email_id));
            for insight in &analysis.headline_insights {
                out.push_str(&format!(
                    "- [{}] {}\n  Key points: {}\n  Summary: {}\n  Links: {}\n",
                    insight.priority_level,
                    insight.theme,
                    insight.key_points.join("; "),
                    insight.summary,
                    insight.relevant_links.join(" "),
                ));
            }
            out.push('\n');
        }
        out
    }

    /// Fetch supporting chunks by embedding similarity. Silently yields
    /// nothing when embeddings are unavailable.
    async fn retrieve_context(&self, focus: &str) -> String {
        let request = EmbeddingRequest {
            model: self.settings.embedding_model.clone(),
            inputs: vec![focus.to_string()],
        };

        let embedding = match self.provider.embed(request).await {
            Ok(response) => match response.embeddings.into_iter().next() {
                Some(e) => e,
                None => return String::new(),
            },
            Err(e) => {
                warn!(error = %e, "Embedding unavailable, synthesizing without retrieval");
                return String::new();
            }
        };

        let hits = self.chunks.search(&embedding, RETRIEVAL_LIMIT).await;
        hits.iter()
            .map(|c| format!("[{} #{}] {}", c.email_id, c.index, c.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Tool for SynthesizeDigestTool {
    fn name(&self) -> &str {
        "synthesize_digest"
    }

    fn description(&self) -> &str {
        "Combine all completed email analyses into a single HTML digest, grouped by theme \
         and ordered by priority. Returns the digest HTML."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "analysis_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Analysis IDs to include (default: all stored analyses)"
                },
                "focus": {
                    "type": "string",
                    "description": "Optional topic to emphasize in the digest"
                }
            },
            "required": []
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let requested: Vec<String> = arguments["analysis_ids"]
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let analyses = if requested.is_empty() {
            self.analyses.all().await
        } else {
            self.analyses.get_by_ids(&requested).await
        };
        if analyses.is_empty() {
            return Err(self.fail("No analyses available; analyze emails first"));
        }

        let focus = arguments["focus"].as_str().unwrap_or("").to_string();
        let rendered = Self::render_analyses(&analyses);

        let retrieval_query = if focus.is_empty() {
            analyses
                .iter()
                .flat_map(|a| a.headline_insights.iter().map(|i| i.theme.clone()))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            focus.clone()
        };
        let supporting = self.retrieve_context(&retrieval_query).await;

        let mut user_prompt = format!("Analyses:\n\n{rendered}");
        if !supporting.is_empty() {
            user_prompt.push_str(&format!("\nSupporting excerpts:\n{supporting}\n"));
        }
        if !focus.is_empty() {
            user_prompt.push_str(&format!("\nEmphasize: {focus}\n"));
        }

        let request = ProviderRequest::new(
            self.settings.model.clone(),
            vec![Message::system(WRITER_PROMPT), Message::user(user_prompt)],
            self.settings.temperature,
        );

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| self.fail(e.to_string()))?;

        let html = response.message.content;
        if html.trim().is_empty() {
            return Err(self.fail("Model returned an empty digest"));
        }

        info!(
            analyses = analyses.len(),
            chars = html.len(),
            "Digest synthesized"
        );

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: html.clone(),
            data: Some(serde_json::json!({ "html": html })),
        })
    }
}
