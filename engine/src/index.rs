use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tokenizer::tokenize;

pub type TermId = u32;
pub type DocId = u32;

/// One news article as ingested. Immutable once inside the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// External stable identifier (kept for judgment matching and display).
    pub id: String,
    pub title: String,
    pub source: String,
    pub published_at: Option<String>,
    pub content: String,
    pub url: Option<String>,
    pub main_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Raw term frequency in the document.
    pub tf: u32,
}

/// Term-frequency weighting policy for the TF-IDF scorer, fixed per index
/// snapshot so scores stay consistent across queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TfWeighting {
    /// 1 + ln(tf) when tf > 0, else 0.
    #[default]
    LogScaled,
    Raw,
}

/// Immutable corpus snapshot: vocabulary, postings, document statistics and
/// the document store itself. Built once per corpus; rebuilding means
/// constructing a fresh value and swapping it in.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CorpusIndex {
    /// Term -> term id, assigned first-seen during the build pass.
    pub dictionary: HashMap<String, TermId>,
    /// Term id -> postings sorted by doc_id.
    pub postings: HashMap<TermId, Vec<Posting>>,
    /// Document frequency, indexed by term id.
    pub df: Vec<u32>,
    /// Token count per document, indexed by doc id.
    pub doc_len: Vec<u32>,
    /// Document store; DocId is the position in ingest order.
    pub docs: Vec<Document>,
    pub avgdl: f32,
    pub tf_weighting: TfWeighting,
}

impl CorpusIndex {
    /// Build the index from the full document collection in one pass.
    ///
    /// Indexes `title + "\n" + content` per document. An empty collection is
    /// a degenerate valid index: every query returns no results. Identical
    /// input in identical order builds an identical index (term ids follow
    /// first-seen order).
    pub fn build(docs: Vec<Document>, tf_weighting: TfWeighting) -> Self {
        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut postings: HashMap<TermId, Vec<Posting>> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        let mut doc_len: Vec<u32> = Vec::with_capacity(docs.len());
        let mut next_term_id: TermId = 0;

        for (doc_id, doc) in docs.iter().enumerate() {
            let doc_id = doc_id as DocId;
            let text = format!("{}\n{}", doc.title, doc.content);
            let tokens = tokenize(&text);
            doc_len.push(tokens.len() as u32);

            let mut counts: HashMap<TermId, u32> = HashMap::new();
            for term in tokens {
                let tid = *dictionary.entry(term).or_insert_with(|| {
                    let id = next_term_id;
                    next_term_id += 1;
                    df.push(0);
                    id
                });
                *counts.entry(tid).or_insert(0) += 1;
            }
            // Documents arrive in doc_id order, so each posting list stays
            // sorted by doc_id without an explicit sort.
            for (tid, tf) in counts {
                df[tid as usize] += 1;
                postings.entry(tid).or_default().push(Posting { doc_id, tf });
            }
        }

        let total_len: u64 = doc_len.iter().map(|&l| u64::from(l)).sum();
        let avgdl = if docs.is_empty() {
            0.0
        } else {
            total_len as f32 / docs.len() as f32
        };

        tracing::debug!(
            num_docs = docs.len(),
            num_terms = dictionary.len(),
            avgdl,
            "corpus index built"
        );

        Self {
            dictionary,
            postings,
            df,
            doc_len,
            docs,
            avgdl,
            tf_weighting,
        }
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.get(term).copied()
    }

    /// Raw term frequency of a term in a document; 0 if absent.
    pub fn term_frequency(&self, term_id: TermId, doc_id: DocId) -> u32 {
        let Some(plist) = self.postings.get(&term_id) else {
            return 0;
        };
        match plist.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(i) => plist[i].tf,
            Err(_) => 0,
        }
    }

    /// Number of documents containing the term; 0 for unseen terms.
    pub fn document_frequency(&self, term_id: TermId) -> u32 {
        self.df.get(term_id as usize).copied().unwrap_or(0)
    }

    pub fn postings(&self, term_id: TermId) -> &[Posting] {
        self.postings.get(&term_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn vocabulary_size(&self) -> usize {
        self.dictionary.len()
    }

    pub fn document_count(&self) -> u32 {
        self.docs.len() as u32
    }

    pub fn average_document_length(&self) -> f32 {
        self.avgdl
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.docs.get(doc_id as usize)
    }

    pub fn document_length(&self, doc_id: DocId) -> u32 {
        self.doc_len.get(doc_id as usize).copied().unwrap_or(0)
    }

    /// Tokenize a query against this index's vocabulary and return its
    /// term-frequency vector, sorted by term id for deterministic scoring.
    /// Terms outside the vocabulary are dropped, never an error.
    pub fn query_vector(&self, text: &str) -> Vec<(TermId, u32)> {
        let mut counts: HashMap<TermId, u32> = HashMap::new();
        for term in tokenize(text) {
            if let Some(tid) = self.term_id(&term) {
                *counts.entry(tid).or_insert(0) += 1;
            }
        }
        let mut vector: Vec<(TermId, u32)> = counts.into_iter().collect();
        vector.sort_unstable_by_key(|&(tid, _)| tid);
        vector
    }
}
