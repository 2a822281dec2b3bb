//! Storage layer for newsbrief.
//!
//! Three stores back the email pipeline:
//! - [`MetadataStore`] — durable email metadata in SQLite
//! - [`ChunkStore`] — in-process chunk text and embeddings, per email
//! - [`AnalysisStore`] — in-process structured analysis results
//!
//! Chunks and analyses live for the duration of one run; metadata persists
//! across runs so already-processed emails can be recognized.

pub mod analysis;
pub mod chunking;
pub mod chunks;
pub mod metadata;

pub use analysis::{AnalysisResult, AnalysisStore, HeadlineInsight};
pub use chunking::chunk_text;
pub use chunks::{ChunkStore, StoredChunk};
pub use metadata::{EmailMetadata, MetadataStore};
