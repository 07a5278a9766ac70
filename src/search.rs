//! Knowledge-base search requests and result ranking.
//!
//! The backend returns a raw `score` per hit. Whether a larger score means a
//! better match depends on the metric of the vector collection, so ranking
//! takes the direction explicitly instead of guessing.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The direction in which `score` improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrder {
    /// Similarity scores (inner product, cosine). The backend's default.
    #[default]
    HigherIsBetter,
    /// Distance scores (L2).
    LowerIsBetter,
}

impl ScoreOrder {
    /// Orders two scores so that the better one comes first.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        let ascending = a.total_cmp(&b);
        match self {
            ScoreOrder::HigherIsBetter => ascending.reverse(),
            ScoreOrder::LowerIsBetter => ascending,
        }
    }

    /// Whether `score` passes a threshold under this ordering.
    pub fn passes(&self, score: f64, threshold: f64) -> bool {
        match self {
            ScoreOrder::HigherIsBetter => score >= threshold,
            ScoreOrder::LowerIsBetter => score <= threshold,
        }
    }
}

/// One ranked chunk returned by a search or a chunk listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub score: f64,
}

/// Body of a search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub query: String,
    pub top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,
}

impl SearchQuery {
    pub const DEFAULT_TOP_K: usize = 10;

    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            top_k: Self::DEFAULT_TOP_K,
            score_threshold: None,
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = Some(threshold);
        self
    }
}

/// Sorts results best match first. The sort is stable, so ties keep the
/// backend's order.
pub fn rank(mut results: Vec<SearchResult>, order: ScoreOrder) -> Vec<SearchResult> {
    results.sort_by(|a, b| order.compare(a.score, b.score));
    results
}

/// Ranks `results` and drops the hits that do not pass `threshold`.
pub fn rank_within(
    results: Vec<SearchResult>,
    order: ScoreOrder,
    threshold: Option<f64>,
) -> Vec<SearchResult> {
    let mut ranked = rank(results, order);
    if let Some(threshold) = threshold {
        ranked.retain(|hit| order.passes(hit.score, threshold));
    }
    ranked
}
