use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use ta_core::tokenizer::tokenize;
use ta_core::{search, Corpus, Index, IndexOptions};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ta-indexer")]
#[command(about = "Inspect the TF-IDF index built from course content and forum posts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CorpusArgs {
    /// Course content JSON file
    #[arg(long, env = "COURSE_CONTENT_PATH", default_value = "course_content.json")]
    course_content: PathBuf,
    /// Discourse posts JSON file
    #[arg(long, env = "DISCOURSE_POSTS_PATH", default_value = "discourse_posts.json")]
    discourse_posts: PathBuf,
    /// Use plain IDF = ln(N/df) instead of the smoothed ln(1 + N/df)
    #[arg(long, default_value_t = false)]
    plain_idf: bool,
}

impl CorpusArgs {
    fn build(&self) -> Result<(Corpus, Index)> {
        let mut corpus = Corpus::load(&self.course_content, &self.discourse_posts)?;
        let documents = std::mem::take(&mut corpus.documents);
        let index = Index::build_with(documents, IndexOptions { smoothed_idf: !self.plain_idf });
        Ok((corpus, index))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load both corpora, build the index and print counts as JSON
    Stats {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Run a query against the index and print the ranked documents as JSON
    Search {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// Query text
        #[arg(long, short)]
        query: String,
        /// Number of results
        #[arg(long, short, default_value_t = 5)]
        k: usize,
    },
    /// Print the normalized documents as JSON lines
    Dump {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Show how a piece of text is tokenized
    Tokens {
        text: String,
    },
}

#[derive(Serialize)]
struct Stats {
    course_documents: usize,
    discourse_documents: usize,
    skipped_records: usize,
    indexed_documents: usize,
    terms: usize,
    generated_at: String,
}

#[derive(Serialize)]
struct Hit<'a> {
    rank: usize,
    score: f32,
    id: &'a str,
    kind: &'a str,
    title: &'a str,
    url: Option<&'a str>,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { corpus } => stats(&corpus),
        Commands::Search { corpus, query, k } => run_search(&corpus, &query, k),
        Commands::Dump { corpus } => dump(&corpus),
        Commands::Tokens { text } => {
            println!("{}", serde_json::to_string(&tokenize(&text))?);
            Ok(())
        }
    }
}

fn stats(args: &CorpusArgs) -> Result<()> {
    let (corpus, index) = args.build()?;
    let stats = Stats {
        course_documents: corpus.course_documents,
        discourse_documents: corpus.discourse_documents,
        skipped_records: corpus.skipped,
        indexed_documents: index.len(),
        terms: index.num_terms(),
        generated_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn run_search(args: &CorpusArgs, query: &str, k: usize) -> Result<()> {
    let (_, index) = args.build()?;
    let result = search(&index, query, k)?;
    tracing::info!(query, hits = result.len(), "search complete");
    let hits: Vec<Hit> = result
        .hits
        .iter()
        .enumerate()
        .map(|(i, h)| Hit {
            rank: i + 1,
            score: h.score,
            id: &h.document.id,
            kind: h.document.kind.label(),
            title: &h.document.title,
            url: h.document.url(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&hits)?);
    Ok(())
}

fn dump(args: &CorpusArgs) -> Result<()> {
    let (_, index) = args.build()?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for doc in index.documents() {
        serde_json::to_writer(&mut out, doc)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
