use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;

use crate::bm25::{Bm25Params, Bm25Scorer};
use crate::index::{CorpusIndex, DocId, TermId};
use crate::tfidf::TfidfScorer;

const SNIPPET_LEN: usize = 250;

/// A ranking function over the shared index. Both algorithms implement this
/// so ranking and evaluation are written once against the trait.
pub trait Scorer {
    fn name(&self) -> &'static str;
    /// Unordered (doc, score) pairs; zero-score documents may be included
    /// and are filtered by the ranker.
    fn score(&self, index: &CorpusIndex, query: &[(TermId, u32)]) -> Vec<(DocId, f32)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Tfidf,
    Bm25,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Tfidf => "tfidf",
            Algorithm::Bm25 => "bm25",
        }
    }

    pub fn scorer(self, bm25: Bm25Params) -> Box<dyn Scorer> {
        match self {
            Algorithm::Tfidf => Box::new(TfidfScorer),
            Algorithm::Bm25 => Box::new(Bm25Scorer { params: bm25 }),
        }
    }
}

/// One result record with display fields hydrated from the document store.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub id: String,
    pub score: f32,
    pub title: String,
    pub url: Option<String>,
    pub source: String,
    pub published_at: Option<String>,
    pub snippet: String,
}

#[derive(Debug, Serialize)]
pub struct RankedList {
    pub results: Vec<SearchHit>,
    /// Wall-clock seconds spent in the scoring pass only.
    pub execution_time: f64,
    pub total_results: usize,
}

#[derive(Debug, Serialize)]
pub struct CompareOutcome {
    pub tfidf: RankedList,
    pub bm25: RankedList,
}

/// Score and order documents for a query: positive scores only, descending
/// by score, ties broken by ascending doc_id so repeated identical queries
/// return identical rankings.
pub fn ranked_docs(
    index: &CorpusIndex,
    scorer: &dyn Scorer,
    query: &str,
    limit: Option<usize>,
) -> Vec<(DocId, f32)> {
    let query_vec = index.query_vector(query);
    if query_vec.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(DocId, f32)> = scorer
        .score(index, &query_vec)
        .into_iter()
        .filter(|&(_, s)| s > 0.0)
        .collect();
    scored.sort_unstable_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    if let Some(limit) = limit {
        scored.truncate(limit);
    }
    scored
}

/// Rank a query under one algorithm and hydrate display fields.
pub fn search(
    index: &CorpusIndex,
    query: &str,
    algorithm: Algorithm,
    limit: Option<usize>,
    bm25: Bm25Params,
) -> Vec<SearchHit> {
    let scorer = algorithm.scorer(bm25);
    let ranked = ranked_docs(index, scorer.as_ref(), query, limit);
    hydrate(index, ranked)
}

/// Like [`search`] but reports how long the scoring pass took. The timer
/// wraps scoring and ordering only, not index access setup or formatting.
pub fn search_timed(
    index: &CorpusIndex,
    query: &str,
    algorithm: Algorithm,
    limit: Option<usize>,
    bm25: Bm25Params,
) -> RankedList {
    let scorer = algorithm.scorer(bm25);
    let start = Instant::now();
    let ranked = ranked_docs(index, scorer.as_ref(), query, limit);
    let execution_time = start.elapsed().as_secs_f64();
    tracing::debug!(
        algorithm = scorer.name(),
        hits = ranked.len(),
        execution_time,
        "query ranked"
    );
    let results = hydrate(index, ranked);
    RankedList {
        total_results: results.len(),
        results,
        execution_time,
    }
}

/// Run both scorers over the same query and index snapshot.
pub fn compare(
    index: &CorpusIndex,
    query: &str,
    limit: Option<usize>,
    bm25: Bm25Params,
) -> CompareOutcome {
    CompareOutcome {
        tfidf: search_timed(index, query, Algorithm::Tfidf, limit, bm25),
        bm25: search_timed(index, query, Algorithm::Bm25, limit, bm25),
    }
}

fn hydrate(index: &CorpusIndex, ranked: Vec<(DocId, f32)>) -> Vec<SearchHit> {
    ranked
        .into_iter()
        .filter_map(|(doc_id, score)| {
            index.document(doc_id).map(|doc| SearchHit {
                doc_id,
                id: doc.id.clone(),
                score,
                title: doc.title.clone(),
                url: doc.url.clone(),
                source: doc.source.clone(),
                published_at: doc.published_at.clone(),
                snippet: make_snippet(&doc.content, SNIPPET_LEN),
            })
        })
        .collect()
}

/// Leading slice of the content, cut back to a word boundary.
pub fn make_snippet(content: &str, max_len: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_len {
        return flat;
    }
    let cut: String = flat.chars().take(max_len).collect();
    match cut.rfind(' ') {
        Some(i) => format!("{}...", &cut[..i]),
        None => format!("{cut}..."),
    }
}
