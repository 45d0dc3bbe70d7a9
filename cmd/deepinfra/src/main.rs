//! DeepInfra CLI - embed texts from the command line.

use anyhow::Context;
use clap::Parser;
use deepinfra_embed::{BlockingEmbedder, DeepInfra, EmbedConfig, EmbedKind, Embedder, blocking};
use tracing_subscriber::EnvFilter;

/// Embed texts with a DeepInfra model and print the vectors as JSON.
///
/// The API token is taken from --token or the DEEPINFRA_API_TOKEN
/// environment variable.
#[derive(Parser)]
#[command(name = "deepinfra")]
#[command(about = "DeepInfra embeddings CLI tool")]
#[command(version)]
struct Cli {
    /// Model ID
    #[arg(short = 'm', long, default_value = deepinfra_embed::DEFAULT_MODEL_ID)]
    model: String,

    /// API token (overrides DEEPINFRA_API_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Inference API base URL
    #[arg(long, default_value = deepinfra_embed::DEFAULT_BASE_URL)]
    base_url: String,

    /// Embed inputs as search queries instead of documents
    #[arg(short = 'q', long)]
    query: bool,

    /// Prefix added to query inputs
    #[arg(long, default_value = "")]
    query_prefix: String,

    /// Prefix added to document inputs
    #[arg(long, default_value = "")]
    text_prefix: String,

    /// Maximum inputs per request
    #[arg(long, default_value_t = deepinfra_embed::MAX_BATCH_SIZE)]
    batch_size: usize,

    /// Use the blocking client
    #[arg(long)]
    blocking: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Texts to embed
    #[arg(required = true)]
    texts: Vec<String>,
}

impl Cli {
    fn config(&self) -> EmbedConfig {
        let mut cfg = EmbedConfig::default()
            .with_model(&self.model)
            .with_base_url(&self.base_url)
            .with_query_prefix(&self.query_prefix)
            .with_text_prefix(&self.text_prefix)
            .with_max_batch_size(self.batch_size);
        if let Some(token) = &self.token {
            cfg = cfg.with_api_token(token);
        }
        cfg
    }

    fn kind(&self) -> EmbedKind {
        if self.query {
            EmbedKind::Query
        } else {
            EmbedKind::Text
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = cli.config();
    let kind = cli.kind();
    let texts = cli.texts;

    let vecs = if cli.blocking {
        let embedder = blocking::DeepInfra::new(cfg);
        tokio::task::spawn_blocking(move || {
            let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
            embedder.embed(&inputs, kind)
        })
        .await
        .context("blocking embed task")??
    } else {
        let embedder = DeepInfra::new(cfg);
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        embedder.embed(&inputs, kind).await?
    };

    tracing::info!(
        count = vecs.len(),
        dim = vecs.first().map_or(0, Vec::len),
        "embedded"
    );
    println!("{}", serde_json::to_string(&vecs)?);
    Ok(())
}
