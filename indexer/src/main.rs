use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::eval::{evaluate_query_set, GoldSet};
use engine::index::{CorpusIndex, Document, TfWeighting};
use engine::persist::{load_index, save_index, save_meta, IndexPaths, MetaFile};
use engine::rank::Algorithm;
use engine::Bm25Params;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    #[serde(default)]
    id: Option<String>,
    title: String,
    content: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    main_image: Option<String>,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the news corpus index and run batch evaluation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from JSON/JSONL article files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Use raw term counts instead of 1 + ln(tf) for TF-IDF weighting
        #[arg(long, default_value_t = false)]
        raw_tf: bool,
    },
    /// Evaluate TF-IDF vs BM25 against a gold judgment file
    Evaluate {
        /// Index directory
        #[arg(long)]
        index: String,
        /// JSON file mapping query -> relevant doc ids or URLs
        #[arg(long)]
        judgments: String,
        /// Ranking cutoff used for average precision
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, raw_tf } => build(&input, &output, raw_tf),
        Commands::Evaluate {
            index,
            judgments,
            top_k,
        } => evaluate(&index, &judgments, top_k),
    }
}

fn build(input: &str, output: &str, raw_tf: bool) -> Result<()> {
    let weighting = if raw_tf {
        TfWeighting::Raw
    } else {
        TfWeighting::LogScaled
    };

    let mut files = collect_input_files(Path::new(input))?;
    // File order determines doc and term id assignment; keep it stable.
    files.sort();

    let mut docs: Vec<Document> = Vec::new();
    for file in &files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(file, &mut docs)?;
        } else {
            read_json(file, &mut docs)?;
        }
    }
    tracing::info!(num_files = files.len(), num_docs = docs.len(), "articles loaded");

    let index = CorpusIndex::build(docs, weighting);
    let paths = IndexPaths::new(output);
    save_index(&paths, &index)?;
    let meta = MetaFile {
        num_docs: index.document_count(),
        num_terms: index.vocabulary_size() as u32,
        avgdl: index.average_document_length(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| String::new()),
        version: 1,
    };
    save_meta(&paths, &meta)?;

    tracing::info!(
        output,
        num_docs = meta.num_docs,
        num_terms = meta.num_terms,
        avgdl = meta.avgdl,
        "index build complete"
    );
    Ok(())
}

fn collect_input_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input path not found: {}", input.display());
    }
    Ok(files)
}

fn read_jsonl(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    for line in BufReader::new(f).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: InputDoc = serde_json::from_str(&line)
            .with_context(|| format!("parsing record in {}", file.display()))?;
        push_doc(doc, docs);
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(f))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)
                    .with_context(|| format!("parsing record in {}", file.display()))?;
                push_doc(doc, docs);
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            push_doc(doc, docs);
        }
        _ => {}
    }
    Ok(())
}

fn push_doc(doc: InputDoc, docs: &mut Vec<Document>) {
    let fallback_id = format!("doc-{}", docs.len());
    docs.push(Document {
        id: doc.id.unwrap_or(fallback_id),
        title: doc.title,
        source: doc.source.unwrap_or_else(|| "unknown".to_string()),
        published_at: doc.published_at,
        content: doc.content,
        url: doc.url,
        main_image: doc.main_image,
    });
}

fn evaluate(index_dir: &str, judgments: &str, top_k: usize) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let index = load_index(&paths)?;
    let gold = GoldSet::from_path(judgments)?;
    let mut queries: Vec<String> = gold.queries().map(str::to_owned).collect();
    queries.sort();
    tracing::info!(num_queries = queries.len(), top_k, "running batch evaluation");

    let params = Bm25Params::default();
    let tfidf = evaluate_query_set(&index, Algorithm::Tfidf, &queries, top_k, &gold, params);
    let bm25 = evaluate_query_set(&index, Algorithm::Bm25, &queries, top_k, &gold, params);

    println!("=== Evaluation summary (top_k = {top_k}) ===");
    println!("MAP TF-IDF: {:.4}", tfidf.map);
    println!("MAP BM25  : {:.4}", bm25.map);
    for (t, b) in tfidf.detail.iter().zip(bm25.detail.iter()) {
        println!(
            "  {:<30} rel={:<3} AP tfidf={:.4} bm25={:.4}",
            t.query, t.relevant_count, t.average_precision, b.average_precision
        );
    }
    Ok(())
}
