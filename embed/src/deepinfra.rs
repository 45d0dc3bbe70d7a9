use std::sync::Arc;

use crate::batch;
use crate::config::{EmbedConfig, EmbedKind, Settings};
use crate::embed::Embedder;
use crate::error::Result;
use crate::transport::{HttpTransport, Transport};

/// DeepInfra embedder using the DeepInfra inference API.
///
/// Inputs are sent in batches of at most `max_batch_size`, one request at
/// a time, and the vectors are returned in input order.
///
/// ```rust,no_run
/// use deepinfra_embed::{DeepInfra, EmbedConfig, Embedder};
///
/// # async fn run() -> deepinfra_embed::Result<()> {
/// let embedder = DeepInfra::new(EmbedConfig::default().with_model("BAAI/bge-base-en-v1.5"));
/// let v = embedder.embed_text("Hello, world!").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DeepInfra {
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
}

impl DeepInfra {
    /// Create an embedder that talks HTTP via reqwest. A missing API token
    /// is read from `DEEPINFRA_API_TOKEN`.
    pub fn new(cfg: EmbedConfig) -> Self {
        Self::with_transport(cfg, HttpTransport::new())
    }

    /// Create an embedder that sends batches through `transport`.
    pub fn with_transport(cfg: EmbedConfig, transport: impl Transport + 'static) -> Self {
        Self {
            settings: Arc::new(cfg.resolve()),
            transport: Arc::new(transport),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    pub fn normalize(&self) -> bool {
        self.settings.normalize
    }

    /// Full endpoint URL, `{base_url}/{model_id}`.
    pub fn url(&self) -> &str {
        &self.settings.url
    }
}

#[async_trait::async_trait]
impl Embedder for DeepInfra {
    async fn embed(&self, inputs: &[&str], kind: EmbedKind) -> Result<Vec<Vec<f32>>> {
        let inputs = self.settings.prefixed(inputs, kind);
        batch::dispatch(
            self.transport.as_ref(),
            &self.settings.url,
            self.settings.api_token.as_deref(),
            &inputs,
            self.settings.max_batch_size,
        )
        .await
    }
}
