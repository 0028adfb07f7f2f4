//! Ranking and evaluation engine for a comparative news search service.
//!
//! A static article corpus is built into an immutable [`CorpusIndex`]
//! snapshot, queried under two scoring functions (TF-IDF dot product and
//! BM25), and the resulting rankings can be measured against a gold
//! relevance set (precision/recall/F1 at cutoffs, average precision, MAP).

pub mod bm25;
pub mod eval;
pub mod index;
pub mod persist;
pub mod rank;
pub mod tfidf;
pub mod tokenizer;

pub use bm25::Bm25Params;
pub use index::{CorpusIndex, DocId, Document, Posting, TermId, TfWeighting};
pub use rank::{Algorithm, CompareOutcome, RankedList, SearchHit};
