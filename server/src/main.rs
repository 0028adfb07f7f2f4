use anyhow::Result;
use axum::Router;
use clap::Parser;
use engine::Bm25Params;
use server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Optional gold judgments JSON (query -> relevant doc ids or URLs)
    #[arg(long)]
    judgments: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// BM25 k1 parameter
    #[arg(long, default_value_t = 1.5)]
    k1: f32,
    /// BM25 b parameter
    #[arg(long, default_value_t = 0.75)]
    b: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let bm25 = Bm25Params { k1: args.k1, b: args.b };
    let app: Router = build_app(&args.index, args.judgments.as_deref(), bm25)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
