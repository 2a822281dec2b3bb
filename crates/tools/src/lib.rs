//! The email pipeline tools.
//!
//! Four tools cover the digest pipeline end to end:
//! - `process_emails` — fetch, extract, chunk, embed, and store emails
//! - `analyze_email` — produce structured insights for one stored email
//! - `synthesize_digest` — combine analyses into an HTML digest
//! - `send_email` — deliver the digest through the mailbox
//!
//! Tools convert their internal failures into `ToolError::ExecutionFailed`,
//! which the executor feeds back to the model as an error tool-result
//! instead of aborting the run.

pub mod analyze_email;
pub mod process_emails;
pub mod send_email;
pub mod synthesize_digest;

pub use analyze_email::AnalyzeEmailTool;
pub use process_emails::ProcessEmailsTool;
pub use send_email::SendEmailTool;
pub use synthesize_digest::SynthesizeDigestTool;

use newsbrief_core::{Provider, ToolRegistry};
use newsbrief_mail::GraphMailClient;
use newsbrief_storage::{AnalysisStore, ChunkStore, MetadataStore};
use std::sync::Arc;

/// Settings shared by the pipeline tools.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Model used for analysis and digest synthesis
    pub model: String,
    /// Model used for chunk embeddings
    pub embedding_model: String,
    pub temperature: f32,
    /// Newsletter senders to fetch from
    pub senders: Vec<String>,
    /// Default recipient for the digest
    pub receiver_email: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Build the standard tool registry with all four pipeline tools.
pub fn default_registry(
    provider: Arc<dyn Provider>,
    mail: Arc<GraphMailClient>,
    metadata: Arc<MetadataStore>,
    chunks: Arc<ChunkStore>,
    analyses: Arc<AnalysisStore>,
    settings: Arc<PipelineSettings>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ProcessEmailsTool::new(
        mail.clone(),
        provider.clone(),
        metadata.clone(),
        chunks.clone(),
        settings.clone(),
    )));
    registry.register(Box::new(AnalyzeEmailTool::new(
        provider.clone(),
        metadata,
        chunks.clone(),
        analyses.clone(),
        settings.clone(),
    )));
    registry.register(Box::new(SynthesizeDigestTool::new(
        provider,
        chunks,
        analyses,
        settings.clone(),
    )));
    registry.register(Box::new(SendEmailTool::new(mail, settings)));
    registry
}
