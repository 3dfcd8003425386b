use super::store::StoredChunk;
use crate::provider::{ProviderError, Reranker};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A chunk picked by the L2 scan, before reranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub doc_id: String,
    pub ordinal: i64,
    pub text: String,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: String,
    pub ordinal: i64,
    pub text: String,
    pub score: f64,
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    Some(
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    )
}

/// Exact nearest-neighbour scan. Each query contributes its `k` nearest
/// chunks; results keep query order, drop repeats and are capped at `k`.
pub fn nearest_candidates(
    chunks: &[StoredChunk],
    query_embeddings: &[Vec<f32>],
    k: usize,
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for query in query_embeddings {
        let mut scored: Vec<(usize, f32)> = chunks
            .iter()
            .enumerate()
            .filter_map(|(idx, chunk)| l2_distance(query, &chunk.embedding).map(|d| (idx, d)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        for (idx, distance) in scored.into_iter().take(k) {
            if !seen.insert(idx) {
                continue;
            }
            let chunk = &chunks[idx];
            out.push(Candidate {
                doc_id: chunk.doc_id.clone(),
                ordinal: chunk.ordinal,
                text: chunk.text.clone(),
                distance,
            });
        }
    }
    out.truncate(k);
    out
}

/// Reranks `candidates` once per query and merges the results: duplicate
/// texts keep their best score, output is sorted by score and cut to `top_n`.
pub fn rerank_candidates(
    reranker: &dyn Reranker,
    queries: &[String],
    candidates: &[Candidate],
    top_n: usize,
) -> Result<Vec<SearchHit>, ProviderError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let documents: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();

    let mut best: HashMap<&str, SearchHit> = HashMap::new();
    for query in queries {
        for hit in reranker.rerank(query, &documents, top_n)? {
            let Some(candidate) = candidates.get(hit.index) else {
                continue;
            };
            let entry = best
                .entry(candidate.text.as_str())
                .or_insert_with(|| SearchHit {
                    doc_id: candidate.doc_id.clone(),
                    ordinal: candidate.ordinal,
                    text: candidate.text.clone(),
                    score: hit.relevance_score,
                });
            if hit.relevance_score > entry.score {
                entry.score = hit.relevance_score;
                entry.doc_id = candidate.doc_id.clone();
                entry.ordinal = candidate.ordinal;
            }
        }
    }

    let mut hits: Vec<SearchHit> = best.into_values().collect();
    sort_hits(&mut hits);
    hits.truncate(top_n);
    Ok(hits)
}

/// L2 ordering used when reranking is unavailable.
pub fn distance_ranked(candidates: &[Candidate], top_n: usize) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|candidate| seen.insert(candidate.text.as_str()))
        .map(|candidate| SearchHit {
            doc_id: candidate.doc_id.clone(),
            ordinal: candidate.ordinal,
            text: candidate.text.clone(),
            score: 1.0 / (1.0 + f64::from(candidate.distance)),
        })
        .take(top_n)
        .collect()
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
            .then_with(|| a.ordinal.cmp(&b.ordinal))
    });
}
