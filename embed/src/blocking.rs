//! Blocking DeepInfra embedder.
//!
//! Same batching and ordering as [`crate::DeepInfra`], but every request
//! blocks the calling thread. Do not call from inside an async runtime.

use std::sync::Arc;

use ureq::Agent;

use crate::batch;
use crate::config::{EmbedConfig, EmbedKind, Settings};
use crate::embed::BlockingEmbedder;
use crate::error::{EmbedError, Result};
use crate::transport::{BatchRequest, BlockingTransport, InferenceRequest, InferenceResponse};

const MAX_RESPONSE_BYTES: u64 = 1 << 30;

/// Blocking HTTP transport backed by ureq.
#[derive(Clone)]
pub struct HttpTransport {
    agent: Agent,
}

impl Default for HttpTransport {
    fn default() -> Self {
        // Non-2xx responses are returned as values so their body can be reported.
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl BlockingTransport for HttpTransport {
    fn post_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::to_vec(&InferenceRequest { inputs: req.inputs })?;
        let mut builder = self
            .agent
            .post(req.url)
            .header("Content-Type", "application/json");
        if let Some(token) = req.api_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let mut resp = builder.send(&body[..])?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.body_mut().read_to_string().unwrap_or_default();
            return Err(EmbedError::Status { status, body });
        }

        // A full batch of large vectors exceeds ureq's default 10 MB read limit.
        let bytes = resp
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()?;
        let data: InferenceResponse = serde_json::from_slice(&bytes)?;
        Ok(data.embeddings)
    }
}

/// Blocking DeepInfra embedder.
#[derive(Clone)]
pub struct DeepInfra {
    settings: Arc<Settings>,
    transport: Arc<dyn BlockingTransport>,
}

impl DeepInfra {
    /// Create an embedder that talks HTTP via ureq. A missing API token
    /// is read from `DEEPINFRA_API_TOKEN`.
    pub fn new(cfg: EmbedConfig) -> Self {
        Self::with_transport(cfg, HttpTransport::new())
    }

    pub fn with_transport(cfg: EmbedConfig, transport: impl BlockingTransport + 'static) -> Self {
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

    pub fn url(&self) -> &str {
        &self.settings.url
    }
}

impl BlockingEmbedder for DeepInfra {
    fn embed(&self, inputs: &[&str], kind: EmbedKind) -> Result<Vec<Vec<f32>>> {
        let inputs = self.settings.prefixed(inputs, kind);
        batch::dispatch_blocking(
            self.transport.as_ref(),
            &self.settings.url,
            self.settings.api_token.as_deref(),
            &inputs,
            self.settings.max_batch_size,
        )
    }
}
