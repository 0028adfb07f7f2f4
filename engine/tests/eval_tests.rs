use std::collections::HashSet;

use engine::eval::{
    evaluate, evaluate_query_set, precision_at_k, recall_at_k, GoldSet, Judgments, Winner,
};
use engine::index::{CorpusIndex, DocId, Document, TfWeighting};
use engine::rank::Algorithm;
use engine::Bm25Params;

fn doc(id: &str, title: &str, content: &str) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        source: "kompas".to_string(),
        published_at: None,
        content: content.to_string(),
        url: Some(format!("https://bola.example/{id}")),
        main_image: None,
    }
}

fn corpus() -> CorpusIndex {
    CorpusIndex::build(
        vec![
            doc("d1", "Final Liga Champions", "liga champions final persib menang"),
            doc("d2", "Jadwal liga", "liga jadwal pekan"),
            doc("d3", "Transfer pemain", "transfer pemain musim panas"),
            doc("d4", "Cuaca bandung", "hujan deras bandung"),
        ],
        TfWeighting::default(),
    )
}

struct FixedJudgments(Vec<(String, Vec<DocId>)>);

impl Judgments for FixedJudgments {
    fn relevant(&self, query: &str, _index: &CorpusIndex) -> Option<HashSet<DocId>> {
        self.0
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, ids)| ids.iter().copied().collect())
    }
}

#[test]
fn recall_is_non_decreasing_in_k() {
    let ranked = [0, 1, 2, 3, 4];
    let relevant: HashSet<DocId> = [1, 4].into_iter().collect();
    let mut last = 0.0;
    for k in 0..=6 {
        let r = recall_at_k(&ranked, &relevant, k);
        assert!(r >= last, "recall dropped at k={k}");
        last = r;
    }
    assert_eq!(last, 1.0);
}

#[test]
fn precision_uses_the_cutoff_as_denominator() {
    let ranked = [0, 1];
    let relevant: HashSet<DocId> = [0, 1].into_iter().collect();
    // Only two results exist; precision@5 still divides by 5.
    assert_eq!(precision_at_k(&ranked, &relevant, 5), 2.0 / 5.0);
    assert_eq!(precision_at_k(&ranked, &relevant, 2), 1.0);
}

#[test]
fn single_query_map_equals_average_precision() {
    let index = corpus();
    let judgments = FixedJudgments(vec![("liga champions".to_string(), vec![0])]);
    let eval = evaluate(&index, "liga champions", 10, &judgments, Bm25Params::default())
        .expect("judged query");
    // d1 ranks first under both algorithms, so AP = 1.0 = MAP.
    assert_eq!(eval.tfidf.map, 1.0);
    assert_eq!(eval.bm25.map, 1.0);
    assert_eq!(eval.comparison.winner_map, Winner::Tie);
    assert_eq!(eval.comparison.map_difference, 0.0);
}

#[test]
fn empty_relevant_set_yields_zero_metrics_not_nan() {
    let index = corpus();
    let judgments = FixedJudgments(vec![("liga champions".to_string(), vec![])]);
    let eval = evaluate(&index, "liga champions", 10, &judgments, Bm25Params::default())
        .expect("judged query");
    assert_eq!(eval.relevant_count, 0);
    for block in [&eval.tfidf, &eval.bm25] {
        assert_eq!(block.precision_at_5, 0.0);
        assert_eq!(block.recall_at_5, 0.0);
        assert_eq!(block.f1_at_5, 0.0);
        assert_eq!(block.precision_at_10, 0.0);
        assert_eq!(block.recall_at_10, 0.0);
        assert_eq!(block.f1_at_10, 0.0);
        assert_eq!(block.map, 0.0);
        assert!(block.map.is_finite());
    }
    assert_eq!(eval.comparison.winner_map, Winner::Tie);
}

#[test]
fn unjudged_query_is_none_not_zero() {
    let index = corpus();
    let judgments = FixedJudgments(vec![]);
    assert!(evaluate(&index, "liga champions", 10, &judgments, Bm25Params::default()).is_none());
}

#[test]
fn gold_set_resolves_ids_and_urls() {
    let index = corpus();
    let json = r#"{
        "liga champions": ["d1", "https://bola.example/d2", "unknown-entry"],
        "transfer": []
    }"#;
    let gold: GoldSet = serde_json::from_str(json).unwrap();
    let relevant = gold.relevant("liga champions", &index).unwrap();
    let expected: HashSet<DocId> = [0, 1].into_iter().collect();
    assert_eq!(relevant, expected);
    assert_eq!(gold.relevant("transfer", &index).unwrap().len(), 0);
    assert!(gold.relevant("missing", &index).is_none());
}

#[test]
fn query_set_map_is_the_mean_of_average_precisions() {
    let index = corpus();
    let judgments = FixedJudgments(vec![
        ("liga champions".to_string(), vec![0]),
        ("transfer pemain".to_string(), vec![2]),
        ("tanpa hasil".to_string(), vec![]),
    ]);
    let queries = vec![
        "liga champions".to_string(),
        "transfer pemain".to_string(),
        "tanpa hasil".to_string(),
    ];
    let report = evaluate_query_set(
        &index,
        Algorithm::Bm25,
        &queries,
        10,
        &judgments,
        Bm25Params::default(),
    );
    assert_eq!(report.detail.len(), 3);
    let mean: f64 = report
        .detail
        .iter()
        .map(|d| d.average_precision)
        .sum::<f64>()
        / 3.0;
    assert!((report.map - mean).abs() < 1e-12);
    // The judged queries both rank their relevant document first.
    assert_eq!(report.detail[0].average_precision, 1.0);
    assert_eq!(report.detail[1].average_precision, 1.0);
    assert_eq!(report.detail[2].average_precision, 0.0);
}
