use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::index::{CorpusIndex, DocId, TermId};
use crate::rank::Scorer;

/// BM25 free parameters. The defaults are the documented constants; the
/// server CLI can override them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// idf(t) = ln((N - df + 0.5) / (df + 0.5) + 1). The "+1" variant keeps
/// idf positive even for terms occurring in most documents.
pub fn idf(num_docs: u32, df: u32) -> f32 {
    let n = num_docs as f32;
    let df = df as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Saturating length-normalized term-frequency component.
pub fn term_score(tf: u32, doc_len: u32, avgdl: f32, params: Bm25Params) -> f32 {
    let tf = tf as f32;
    let norm_dl = if avgdl > 0.0 { doc_len as f32 / avgdl } else { 1.0 };
    tf * (params.k1 + 1.0) / (tf + params.k1 * (1.0 - params.b + params.b * norm_dl))
}

pub struct Bm25Scorer {
    pub params: Bm25Params,
}

impl Scorer for Bm25Scorer {
    fn name(&self) -> &'static str {
        "bm25"
    }

    fn score(&self, index: &CorpusIndex, query: &[(TermId, u32)]) -> Vec<(DocId, f32)> {
        let n = index.document_count();
        let avgdl = index.average_document_length();
        let mut scores: HashMap<DocId, f32> = HashMap::new();
        for &(tid, qtf) in query {
            let df = index.document_frequency(tid);
            if df == 0 {
                continue;
            }
            let idf_t = idf(n, df);
            for p in index.postings(tid) {
                let contrib =
                    qtf as f32 * idf_t * term_score(p.tf, index.document_length(p.doc_id), avgdl, self.params);
                *scores.entry(p.doc_id).or_insert(0.0) += contrib;
            }
        }
        scores.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_positive_for_common_terms() {
        assert!(idf(5, 5) > 0.0);
        assert!(idf(5, 1) > idf(5, 4));
    }

    #[test]
    fn tf_saturates() {
        let p = Bm25Params::default();
        let s2 = term_score(2, 10, 10.0, p);
        let s4 = term_score(4, 10, 10.0, p);
        assert!(s4 > s2);
        assert!(s4 < 2.0 * s2);
    }

    #[test]
    fn longer_docs_normalized_down() {
        let p = Bm25Params::default();
        assert!(term_score(3, 20, 10.0, p) < term_score(3, 5, 10.0, p));
    }

    #[test]
    fn zero_avgdl_guard() {
        let p = Bm25Params::default();
        assert!(term_score(1, 0, 0.0, p).is_finite());
    }
}
