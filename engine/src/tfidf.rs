use std::collections::HashMap;

use crate::index::{CorpusIndex, DocId, TermId, TfWeighting};
use crate::rank::Scorer;

/// Term-frequency weight under the index's configured policy.
pub fn tf_weight(tf: u32, weighting: TfWeighting) -> f32 {
    match weighting {
        TfWeighting::Raw => tf as f32,
        TfWeighting::LogScaled => {
            if tf > 0 {
                1.0 + (tf as f32).ln()
            } else {
                0.0
            }
        }
    }
}

/// idf(t) = ln(N / df). Unseen terms (df = 0) contribute nothing; they
/// cannot match any document anyway.
pub fn idf(num_docs: u32, df: u32) -> f32 {
    if df == 0 || num_docs == 0 {
        0.0
    } else {
        (num_docs as f32 / df as f32).ln()
    }
}

/// TF-IDF dot-product scorer: per query term t with query count qtf,
/// a matching document gains `qtf * tf_weight(tf(t, D)) * idf(t)`.
pub struct TfidfScorer;

impl Scorer for TfidfScorer {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn score(&self, index: &CorpusIndex, query: &[(TermId, u32)]) -> Vec<(DocId, f32)> {
        let n = index.document_count();
        let mut scores: HashMap<DocId, f32> = HashMap::new();
        for &(tid, qtf) in query {
            let idf_t = idf(n, index.document_frequency(tid));
            if idf_t <= 0.0 {
                // Term appears in every document; zero discrimination.
                continue;
            }
            for p in index.postings(tid) {
                let contrib = qtf as f32 * tf_weight(p.tf, index.tf_weighting) * idf_t;
                *scores.entry(p.doc_id).or_insert(0.0) += contrib;
            }
        }
        scores.into_iter().collect()
    }
}
