//! Reciprocal Rank Fusion of ranked candidate lists and bounded selection of
//! re-ranked results.

use crate::chunk::ChunkMetadata;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_RRF_K: f64 = 1.0;

/// One entry of a source ranking (lexical or vector). `score` is in the
/// source's own units and is not comparable across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// 0-based position within the source ranking.
    pub rank: usize,
    pub score: f64,
}

/// Build candidates from an already ordered list; rank is the position.
pub fn ranked<I>(items: I) -> Vec<Candidate>
where
    I: IntoIterator<Item = (String, String, ChunkMetadata, f64)>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(rank, (id, text, metadata, score))| Candidate { id, text, metadata, rank, score })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub fused_score: f64,
}

/// Sum `1 / (k + rank)` per id across `lists` and order by that sum,
/// highest first. Equal sums keep the order in which ids were first seen,
/// scanning the lists in order. Text and metadata come from the first
/// occurrence. Empty lists simply contribute nothing.
pub fn reciprocal_rank_fusion(lists: &[Vec<Candidate>], k: f64) -> Vec<FusedCandidate> {
    let mut fused: Vec<FusedCandidate> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for list in lists {
        for candidate in list {
            let contribution = 1.0 / (k + candidate.rank as f64);
            match slots.get(candidate.id.as_str()) {
                Some(&slot) => fused[slot].fused_score += contribution,
                None => {
                    slots.insert(candidate.id.as_str(), fused.len());
                    fused.push(FusedCandidate {
                        id: candidate.id.clone(),
                        text: candidate.text.clone(),
                        metadata: candidate.metadata.clone(),
                        fused_score: contribution,
                    });
                }
            }
        }
    }
    fused.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));
    fused
}

/// A fused candidate after cross-encoder scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub relevance: f32,
}

/// Attach relevance scores to fused candidates and sort by them, highest
/// first (stable for equal scores). Scores must be finite, one per candidate.
pub fn apply_rerank_scores(fused: Vec<FusedCandidate>, scores: &[f32]) -> Result<Vec<RankedPassage>> {
    if fused.len() != scores.len() {
        return Err(Error::upstream(
            "relevance scorer",
            anyhow::anyhow!("returned {} scores for {} passages", scores.len(), fused.len()),
        ));
    }
    if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
        return Err(Error::upstream(
            "relevance scorer",
            anyhow::anyhow!("returned non-finite score {} for passage {pos}", scores[pos]),
        ));
    }
    let mut passages: Vec<RankedPassage> = fused
        .into_iter()
        .zip(scores)
        .map(|(c, &relevance)| RankedPassage { id: c.id, text: c.text, metadata: c.metadata, relevance })
        .collect();
    passages.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    Ok(passages)
}

/// Decides how many re-ranked passages reach answer generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    /// Passages must score strictly above this to pass.
    pub threshold: f32,
    pub min_results: usize,
    pub max_results: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self { threshold: 0.45, min_results: 3, max_results: 5 }
    }
}

impl SelectionPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.min_results > self.max_results {
            return Err(Error::invalid(format!(
                "min_results ({}) exceeds max_results ({})",
                self.min_results, self.max_results
            )));
        }
        Ok(())
    }

    /// `sorted` must already be ordered by descending relevance. Keeps the
    /// passages above the threshold; too few and the threshold is dropped in
    /// favour of the top `min_results`, too many and the list is cut to
    /// `max_results`.
    pub fn select(&self, mut sorted: Vec<RankedPassage>) -> Vec<RankedPassage> {
        let passing = sorted.iter().filter(|p| p.relevance > self.threshold).count();
        if passing < self.min_results {
            sorted.truncate(self.min_results);
            return sorted;
        }
        sorted.retain(|p| p.relevance > self.threshold);
        sorted.truncate(self.max_results);
        sorted
    }
}
