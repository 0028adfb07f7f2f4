//! Relevance evaluation: precision/recall/F1 at cutoffs, average precision
//! and MAP, plus the TF-IDF vs BM25 comparison verdict.
//!
//! The judgment source is injected via [`Judgments`]; the shipped
//! implementation is [`GoldSet`], a JSON map from query to relevant
//! document ids or URLs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::bm25::Bm25Params;
use crate::index::{CorpusIndex, DocId};
use crate::rank::{ranked_docs, Algorithm};

/// Source of relevance judgments for queries.
pub trait Judgments {
    /// Relevant documents for a query, or `None` when the source carries no
    /// entry for it at all. A `Some` with an empty set is a genuine
    /// "nothing is relevant" judgment.
    fn relevant(&self, query: &str, index: &CorpusIndex) -> Option<HashSet<DocId>>;
}

/// Gold relevance set loaded from JSON: `{ "query": ["doc id or url", ...] }`.
/// Entries are resolved against the index by external id first, then URL;
/// entries matching no document are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct GoldSet {
    #[serde(flatten)]
    queries: HashMap<String, Vec<String>>,
}

impl GoldSet {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading judgments file {}", path.as_ref().display()))?;
        let gold: GoldSet = serde_json::from_str(&raw).context("parsing judgments JSON")?;
        Ok(gold)
    }

    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl Judgments for GoldSet {
    fn relevant(&self, query: &str, index: &CorpusIndex) -> Option<HashSet<DocId>> {
        let entries = self.queries.get(query)?;
        Some(
            entries
                .iter()
                .filter_map(|key| resolve(index, key))
                .collect(),
        )
    }
}

fn resolve(index: &CorpusIndex, key: &str) -> Option<DocId> {
    index
        .docs
        .iter()
        .position(|d| d.id == key || d.url.as_deref() == Some(key))
        .map(|i| i as DocId)
}

/// precision@K = |relevant ∩ top-K| / K. Defined as 0 for K = 0.
pub fn precision_at_k(ranked: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|d| relevant.contains(d)).count();
    hits as f64 / k as f64
}

/// recall@K = |relevant ∩ top-K| / |relevant|; 0 by convention when the
/// relevant set is empty.
pub fn recall_at_k(ranked: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|d| relevant.contains(d)).count();
    hits as f64 / relevant.len() as f64
}

/// Harmonic mean of precision and recall; 0 when both are 0.
pub fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// AP = (1/|relevant|) * Σ precision@r at each rank r holding a relevant
/// document; 0 when no relevant documents exist.
pub fn average_precision(ranked: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, doc) in ranked.iter().enumerate() {
        if relevant.contains(doc) {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

/// Mean of per-query average precisions; 0 for an empty query set.
pub fn mean_average_precision(aps: &[f64]) -> f64 {
    if aps.is_empty() {
        0.0
    } else {
        aps.iter().sum::<f64>() / aps.len() as f64
    }
}

/// Fixed-cutoff metric block reported per algorithm.
#[derive(Debug, Clone, Serialize)]
pub struct MetricBlock {
    pub precision_at_5: f64,
    pub recall_at_5: f64,
    pub f1_at_5: f64,
    pub precision_at_10: f64,
    pub recall_at_10: f64,
    pub f1_at_10: f64,
    pub map: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Tfidf,
    Bm25,
    Tie,
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub winner_map: Winner,
    pub map_difference: f64,
}

/// Pick the higher-MAP algorithm; equal MAPs are an explicit tie.
pub fn verdict(tfidf_map: f64, bm25_map: f64) -> Verdict {
    let winner_map = if tfidf_map > bm25_map {
        Winner::Tfidf
    } else if bm25_map > tfidf_map {
        Winner::Bm25
    } else {
        Winner::Tie
    };
    Verdict {
        winner_map,
        map_difference: (tfidf_map - bm25_map).abs(),
    }
}

#[derive(Debug, Serialize)]
pub struct Evaluation {
    pub relevant_count: usize,
    pub tfidf: MetricBlock,
    pub bm25: MetricBlock,
    pub comparison: Verdict,
}

fn metrics_for(ranked: &[DocId], relevant: &HashSet<DocId>, top_k: usize) -> MetricBlock {
    let p5 = precision_at_k(ranked, relevant, 5);
    let r5 = recall_at_k(ranked, relevant, 5);
    let p10 = precision_at_k(ranked, relevant, 10);
    let r10 = recall_at_k(ranked, relevant, 10);
    let capped = &ranked[..ranked.len().min(top_k)];
    MetricBlock {
        precision_at_5: p5,
        recall_at_5: r5,
        f1_at_5: f1(p5, r5),
        precision_at_10: p10,
        recall_at_10: r10,
        f1_at_10: f1(p10, r10),
        map: average_precision(capped, relevant),
    }
}

/// Evaluate one query under both algorithms. Returns `None` when the
/// judgment source has no entry for the query; an entry with an empty
/// relevant set yields genuine zero metrics. For a single query, `map`
/// equals that query's average precision over its top-K ranking.
pub fn evaluate(
    index: &CorpusIndex,
    query: &str,
    top_k: usize,
    judgments: &dyn Judgments,
    bm25: Bm25Params,
) -> Option<Evaluation> {
    let relevant = judgments.relevant(query, index)?;
    let tfidf_ranked = ranked_ids(index, Algorithm::Tfidf, query, bm25);
    let bm25_ranked = ranked_ids(index, Algorithm::Bm25, query, bm25);
    let tfidf_metrics = metrics_for(&tfidf_ranked, &relevant, top_k);
    let bm25_metrics = metrics_for(&bm25_ranked, &relevant, top_k);
    let comparison = verdict(tfidf_metrics.map, bm25_metrics.map);
    Some(Evaluation {
        relevant_count: relevant.len(),
        tfidf: tfidf_metrics,
        bm25: bm25_metrics,
        comparison,
    })
}

#[derive(Debug, Serialize)]
pub struct QueryDetail {
    pub query: String,
    pub relevant_count: usize,
    pub precision_at_5: f64,
    pub precision_at_10: f64,
    pub average_precision: f64,
}

#[derive(Debug, Serialize)]
pub struct QuerySetReport {
    pub algorithm: Algorithm,
    pub map: f64,
    pub detail: Vec<QueryDetail>,
}

/// Evaluate a whole query set under one algorithm; MAP is the mean of the
/// per-query average precisions. Queries missing from the judgment source
/// count with an empty relevant set, matching the batch-evaluation
/// convention rather than being skipped.
pub fn evaluate_query_set(
    index: &CorpusIndex,
    algorithm: Algorithm,
    queries: &[String],
    top_k: usize,
    judgments: &dyn Judgments,
    bm25: Bm25Params,
) -> QuerySetReport {
    let mut aps = Vec::with_capacity(queries.len());
    let mut detail = Vec::with_capacity(queries.len());
    for query in queries {
        let relevant = judgments.relevant(query, index).unwrap_or_default();
        let ranked = ranked_ids(index, algorithm, query, bm25);
        let capped = &ranked[..ranked.len().min(top_k)];
        let ap = average_precision(capped, &relevant);
        aps.push(ap);
        detail.push(QueryDetail {
            query: query.clone(),
            relevant_count: relevant.len(),
            precision_at_5: precision_at_k(&ranked, &relevant, 5),
            precision_at_10: precision_at_k(&ranked, &relevant, 10),
            average_precision: ap,
        });
    }
    QuerySetReport {
        algorithm,
        map: mean_average_precision(&aps),
        detail,
    }
}

fn ranked_ids(index: &CorpusIndex, algorithm: Algorithm, query: &str, bm25: Bm25Params) -> Vec<DocId> {
    let scorer = algorithm.scorer(bm25);
    ranked_docs(index, scorer.as_ref(), query, None)
        .into_iter()
        .map(|(doc_id, _)| doc_id)
        .collect()
}
