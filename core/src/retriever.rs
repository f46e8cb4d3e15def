//! Hybrid retrieval: BM25 over the stored chunks plus vector search, fused
//! with RRF, re-ranked by a cross-encoder and trimmed by the selection policy.
//!
//! The vector store, embedding model and relevance model live outside this
//! crate. They are constructed once by the caller and lent to the retriever.

use crate::chunk::ChunkMetadata;
use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::fusion::{apply_rerank_scores, reciprocal_rank_fusion, Candidate, FusedCandidate, RankedPassage};
use crate::create_bm25;

/// A stored chunk as returned by a full scan of the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A nearest-neighbour hit; hits arrive ordered best first.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

pub trait VectorStore {
    /// Every stored chunk, restricted to one knowledge base when given.
    fn scroll(&self, kb_name: Option<&str>) -> anyhow::Result<Vec<StoredPoint>>;

    fn search(&self, vector: &[f32], top_k: usize, kb_name: Option<&str>) -> anyhow::Result<Vec<VectorHit>>;
}

pub trait Embedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Cross-encoder scoring of `(query, passage)` pairs, one score per passage.
pub trait RelevanceScorer {
    fn score(&self, query: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>>;
}

/// Key shared by both legs so that RRF can match them up.
pub fn candidate_id(point_id: &str) -> String {
    format!("chunk_{point_id}")
}

pub struct HybridRetriever<'a> {
    store: &'a dyn VectorStore,
    embedder: &'a dyn Embedder,
    scorer: &'a dyn RelevanceScorer,
    config: RetrievalConfig,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(
        store: &'a dyn VectorStore,
        embedder: &'a dyn Embedder,
        scorer: &'a dyn RelevanceScorer,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, embedder, scorer, config })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// BM25 over the chunks currently stored for `kb_name`. An empty store
    /// yields no candidates rather than an error.
    pub fn lexical_candidates(&self, query: &str, kb_name: Option<&str>) -> Result<Vec<Candidate>> {
        let points = self
            .store
            .scroll(kb_name)
            .map_err(|e| Error::upstream("vector store scroll", e))?;
        if points.is_empty() {
            tracing::warn!(kb_name = ?kb_name, "no stored chunks, skipping lexical search");
            return Ok(Vec::new());
        }
        let corpus: Vec<String> = points.iter().map(|p| p.text.clone()).collect();
        let index = create_bm25(corpus, &self.config.language, self.config.bm25, None)?;
        let hits = index.search(query, self.config.top_k)?;
        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| {
                let point = &points[hit.doc_id];
                Candidate {
                    id: candidate_id(&point.id),
                    text: point.text.clone(),
                    metadata: point.metadata.clone(),
                    rank,
                    score: hit.score,
                }
            })
            .collect())
    }

    pub fn vector_candidates(&self, query: &str, kb_name: Option<&str>) -> Result<Vec<Candidate>> {
        let vector = self.embedder.embed(query).map_err(|e| Error::upstream("embedder", e))?;
        let hits = self
            .store
            .search(&vector, self.config.top_k, kb_name)
            .map_err(|e| Error::upstream("vector store search", e))?;
        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| Candidate {
                id: candidate_id(&hit.id),
                text: hit.text,
                metadata: hit.metadata,
                rank,
                score: hit.score as f64,
            })
            .collect())
    }

    /// Vector and lexical rankings merged with RRF.
    pub fn fuse(&self, query: &str, kb_name: Option<&str>) -> Result<Vec<FusedCandidate>> {
        let vector = self.vector_candidates(query, kb_name)?;
        let lexical = self.lexical_candidates(query, kb_name)?;
        tracing::debug!(vector = vector.len(), lexical = lexical.len(), "fusing rankings");
        Ok(reciprocal_rank_fusion(&[vector, lexical], self.config.rrf_k))
    }

    pub fn rerank(&self, query: &str, fused: Vec<FusedCandidate>) -> Result<Vec<RankedPassage>> {
        if fused.is_empty() {
            return Ok(Vec::new());
        }
        let passages: Vec<&str> = fused.iter().map(|c| c.text.as_str()).collect();
        let scores = self
            .scorer
            .score(query, &passages)
            .map_err(|e| Error::upstream("relevance scorer", e))?;
        apply_rerank_scores(fused, &scores)
    }

    /// Full pipeline: fuse, re-rank, select.
    pub fn retrieve(&self, query: &str, kb_name: Option<&str>) -> Result<Vec<RankedPassage>> {
        let fused = self.fuse(query, kb_name)?;
        let reranked = self.rerank(query, fused)?;
        let selected = self.config.selection.select(reranked);
        tracing::info!(kb_name = ?kb_name, selected = selected.len(), "hybrid retrieval done");
        Ok(selected)
    }
}
