//! In-process chunk store with embedding search.
//!
//! Chunks are grouped per email and keep their original order. Searching
//! ranks chunks by cosine similarity against a query embedding.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// One chunk of an email body, with its position and optional embedding.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub email_id: String,
    /// Position of this chunk within its email, starting at 0
    pub index: usize,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

/// In-memory chunk store, keyed by email id.
pub struct ChunkStore {
    chunks: RwLock<HashMap<String, Vec<StoredChunk>>>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Store the chunks for one email, replacing any previous set.
    pub async fn store_chunks(&self, email_id: &str, chunks: Vec<StoredChunk>) {
        debug!(email_id, count = chunks.len(), "Storing email chunks");
        let mut map = self.chunks.write().await;
        map.insert(email_id.to_string(), chunks);
    }

    /// Get up to `limit` chunks for an email, in document order.
    pub async fn get_chunks(&self, email_id: &str, limit: usize) -> Vec<StoredChunk> {
        let map = self.chunks.read().await;
        map.get(email_id)
            .map(|chunks| chunks.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// IDs of all emails with stored chunks.
    pub async fn email_ids(&self) -> Vec<String> {
        let map = self.chunks.read().await;
        let mut ids: Vec<String> = map.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Rank all stored chunks by cosine similarity to `query_embedding`
    /// and return the top `limit`. Chunks without embeddings are skipped.
    pub async fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<StoredChunk> {
        let map = self.chunks.read().await;
        let mut scored: Vec<(f32, &StoredChunk)> = map
            .values()
            .flatten()
            .filter_map(|c| {
                c.embedding
                    .as_ref()
                    .map(|e| (cosine_similarity(query_embedding, e), c))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cosine similarity between two vectors. Returns 0.0 for mismatched
/// lengths or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
