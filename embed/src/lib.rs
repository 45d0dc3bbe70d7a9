//! Batched text embeddings over the DeepInfra inference API.
//!
//! [`DeepInfra`] is the async client and [`blocking::DeepInfra`] the
//! blocking one. Both split inputs into batches of at most
//! [`MAX_BATCH_SIZE`], send them one after another, and return one vector
//! per input in input order.

pub mod batch;
pub mod blocking;
pub mod config;
pub mod deepinfra;
pub mod embed;
pub mod error;
pub mod transport;

pub use batch::chunk;
pub use config::{
    API_TOKEN_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL_ID, EmbedConfig, EmbedKind, MAX_BATCH_SIZE,
    resolve_api_token,
};
pub use deepinfra::DeepInfra;
pub use embed::{BlockingEmbedder, Embedder};
pub use error::{EmbedError, Result};
pub use transport::{BatchRequest, BlockingTransport, HttpTransport, Transport};
