use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{EmbedError, Result};

/// A single batch call against the inference endpoint.
#[derive(Debug, Clone, Copy)]
pub struct BatchRequest<'a> {
    pub url: &'a str,
    pub api_token: Option<&'a str>,
    pub inputs: &'a [String],
}

/// Performs one batch call and returns one vector per input, in input order.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn post_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<Vec<f32>>>;
}

/// Blocking counterpart of [`Transport`].
pub trait BlockingTransport: Send + Sync {
    fn post_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<Vec<f32>>>;
}

/// Inference request body.
#[derive(Serialize)]
pub(crate) struct InferenceRequest<'a> {
    pub(crate) inputs: &'a [String],
}

/// Inference response; fields other than `embeddings` are ignored.
#[derive(Deserialize)]
pub(crate) struct InferenceResponse {
    pub(crate) embeddings: Vec<Vec<f32>>,
}

/// Async HTTP transport backed by reqwest.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing client, e.g. one configured with timeouts or a proxy.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn post_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<Vec<f32>>> {
        let mut builder = self
            .client
            .post(req.url)
            .header("Content-Type", "application/json")
            .json(&InferenceRequest { inputs: req.inputs });
        if let Some(token) = req.api_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let resp = builder.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Status { status, body });
        }

        let bytes = resp.bytes().await?;
        let data: InferenceResponse = serde_json::from_slice(&bytes)?;
        Ok(data.embeddings)
    }
}
