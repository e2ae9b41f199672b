use anyhow::Result;
use axum::Router;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use ta_answer::{GeminiClient, OcrBackend, Pipeline, PipelineConfig, TesseractCli};
use ta_core::{Corpus, Index};
use ta_server::build_app;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OcrChoice {
    /// Transcribe images with the Gemini model
    Gemini,
    /// Run a local tesseract binary
    Tesseract,
    /// Ignore attached images
    Off,
}

#[derive(Parser)]
#[command(name = "ta-server")]
#[command(about = "Answer course questions from course content and forum posts", long_about = None)]
struct Args {
    /// Course content JSON file
    #[arg(long, env = "COURSE_CONTENT_PATH", default_value = "course_content.json")]
    course_content: PathBuf,
    /// Discourse posts JSON file
    #[arg(long, env = "DISCOURSE_POSTS_PATH", default_value = "discourse_posts.json")]
    discourse_posts: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,
    /// Documents retrieved per question
    #[arg(long, default_value_t = 5)]
    top_k: usize,
    /// Maximum links per answer
    #[arg(long, default_value_t = 5)]
    max_links: usize,
    /// Drop retrieved documents scoring at or below this
    #[arg(long, default_value_t = 0.0)]
    min_score: f32,
    /// Characters of each document included in the prompt
    #[arg(long, default_value_t = 1000)]
    context_chars: usize,
    /// Deadline in seconds for each external call
    #[arg(long, default_value_t = 10)]
    call_timeout_secs: u64,
    /// How to read text from attached images
    #[arg(long, value_enum, default_value_t = OcrChoice::Gemini)]
    ocr: OcrChoice,
    /// Path to the tesseract binary (with --ocr tesseract)
    #[arg(long, default_value = "tesseract")]
    tesseract_bin: PathBuf,
    /// Tesseract language, e.g. "eng"
    #[arg(long)]
    tesseract_lang: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    // The index must exist before the first request is accepted.
    let corpus = Corpus::load(&args.course_content, &args.discourse_posts)?;
    tracing::info!(
        course = corpus.course_documents,
        discourse = corpus.discourse_documents,
        skipped = corpus.skipped,
        "corpora loaded"
    );
    let index = Arc::new(Index::build(corpus.documents));

    let call_timeout = Duration::from_secs(args.call_timeout_secs);
    let llm = GeminiClient::from_env(reqwest::Client::new())?.with_timeout(call_timeout);
    let ocr = match args.ocr {
        OcrChoice::Gemini => OcrBackend::Gemini(llm.clone()),
        OcrChoice::Tesseract => {
            let cli = TesseractCli::new(&args.tesseract_bin);
            OcrBackend::Tesseract(match &args.tesseract_lang {
                Some(lang) => cli.with_language(lang),
                None => cli,
            })
        }
        OcrChoice::Off => OcrBackend::Disabled,
    };
    tracing::info!(model = llm.model(), ocr = ?args.ocr, "language model configured");

    let config = PipelineConfig {
        top_k: args.top_k,
        max_links: args.max_links,
        min_score: args.min_score,
        context_chars: args.context_chars,
        call_timeout,
    };
    let pipeline = Arc::new(Pipeline::new(index, llm, ocr, config));
    let app: Router = build_app(pipeline);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
