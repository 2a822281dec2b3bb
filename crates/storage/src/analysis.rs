//! Structured analysis results.
//!
//! The analysis of one email is a list of headline insights. Results are
//! kept in memory for the duration of a run; the digest step reads them
//! back by analysis id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One themed insight extracted from an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlineInsight {
    /// Short theme label (e.g., "Model Releases")
    pub theme: String,
    pub key_points: Vec<String>,
    pub summary: String,
    /// Cleaned URLs backing this insight
    pub relevant_links: Vec<String>,
    /// "high", "medium", or "low"
    pub priority_level: String,
}

/// The complete analysis of one email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub email_id: String,
    pub headline_insights: Vec<HeadlineInsight>,
}

/// In-memory store of analysis results, keyed by a generated analysis id.
pub struct AnalysisStore {
    results: RwLock<HashMap<String, AnalysisResult>>,
}

impl AnalysisStore {
    pub fn new() -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
        }
    }

    /// Store an analysis result and return its generated id.
    pub async fn store(&self, result: AnalysisResult) -> String {
        let analysis_id = Uuid::new_v4().to_string();
        let mut map = self.results.write().await;
        map.insert(analysis_id.clone(), result);
        analysis_id
    }

    /// Get one analysis by id.
    pub async fn get(&self, analysis_id: &str) -> Option<AnalysisResult> {
        let map = self.results.read().await;
        map.get(analysis_id).cloned()
    }

    /// Get the analyses for the given ids, in the given order. Unknown ids
    /// are skipped.
    pub async fn get_by_ids(&self, analysis_ids: &[String]) -> Vec<AnalysisResult> {
        let map = self.results.read().await;
        analysis_ids
            .iter()
            .filter_map(|id| map.get(id).cloned())
            .collect()
    }

    /// Get all stored analyses, in insertion-independent but stable order
    /// (sorted by email id).
    pub async fn all(&self) -> Vec<AnalysisResult> {
        let map = self.results.read().await;
        let mut results: Vec<AnalysisResult> = map.values().cloned().collect();
        results.sort_by(|a, b| a.email_id.cmp(&b.email_id));
        results
    }
}

impl Default for AnalysisStore {
    fn default() -> Self {
        Self::new()
    }
}
