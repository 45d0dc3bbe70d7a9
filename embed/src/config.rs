use serde::{Deserialize, Serialize};

/// DeepInfra inference API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.deepinfra.com/v1/inference";

/// Default embedding model.
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/clip-ViT-B-32";

/// Environment variable holding the DeepInfra API token.
pub const API_TOKEN_ENV: &str = "DEEPINFRA_API_TOKEN";

/// Maximum number of inputs sent in one request.
pub const MAX_BATCH_SIZE: usize = 1024;

/// Kind of input being embedded.
///
/// Asymmetric retrieval models expect different prefixes for search
/// queries and for the documents being searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    Query,
    Text,
}

/// Builder-style configuration for the DeepInfra embedders.
///
/// Empty strings and a zero batch size mean "use the default", so the
/// struct can be deserialized from partial config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub model_id: String,
    /// Kept for API compatibility; vectors are returned as the service sends them.
    pub normalize: bool,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Fall back to [`API_TOKEN_ENV`] when `api_token` is unset.
    pub token_from_env: bool,
    pub query_prefix: String,
    pub text_prefix: String,
    pub base_url: String,
    pub max_batch_size: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            normalize: false,
            api_token: None,
            token_from_env: true,
            query_prefix: String::new(),
            text_prefix: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl EmbedConfig {
    pub fn with_model(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_api_token(mut self, token: &str) -> Self {
        self.api_token = Some(token.to_string());
        self
    }

    pub fn with_token_from_env(mut self, enabled: bool) -> Self {
        self.token_from_env = enabled;
        self
    }

    pub fn with_query_prefix(mut self, prefix: &str) -> Self {
        self.query_prefix = prefix.to_string();
        self
    }

    pub fn with_text_prefix(mut self, prefix: &str) -> Self {
        self.text_prefix = prefix.to_string();
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Apply defaults and resolve the API token, consulting the process
    /// environment unless `token_from_env` is off.
    pub(crate) fn resolve(self) -> Settings {
        let from_env = self.token_from_env;
        self.resolve_with(|key| {
            if from_env {
                std::env::var(key).ok()
            } else {
                None
            }
        })
    }

    pub(crate) fn resolve_with(self, lookup: impl FnOnce(&str) -> Option<String>) -> Settings {
        let api_token = resolve_api_token(self.api_token, lookup);
        let model_id = if self.model_id.is_empty() {
            DEFAULT_MODEL_ID.to_string()
        } else {
            self.model_id
        };
        let base_url = if self.base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            self.base_url.trim_end_matches('/').to_string()
        };
        let max_batch_size = if self.max_batch_size == 0 {
            MAX_BATCH_SIZE
        } else {
            self.max_batch_size
        };

        if api_token.is_none() {
            tracing::warn!(
                model = %model_id,
                "no DeepInfra API token configured (set {API_TOKEN_ENV}); requests will likely be rejected"
            );
        }

        Settings {
            url: format!("{base_url}/{model_id}"),
            model_id,
            normalize: self.normalize,
            api_token,
            query_prefix: self.query_prefix,
            text_prefix: self.text_prefix,
            max_batch_size,
        }
    }
}

/// Resolve the API token: an explicit non-empty value wins, then the
/// [`API_TOKEN_ENV`] variable via `lookup`, otherwise none.
pub fn resolve_api_token(
    explicit: Option<String>,
    lookup: impl FnOnce(&str) -> Option<String>,
) -> Option<String> {
    explicit
        .filter(|t| !t.is_empty())
        .or_else(|| lookup(API_TOKEN_ENV).filter(|t| !t.is_empty()))
}

/// Resolved, immutable client settings shared by both execution modes.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) url: String,
    pub(crate) model_id: String,
    pub(crate) normalize: bool,
    pub(crate) api_token: Option<String>,
    pub(crate) query_prefix: String,
    pub(crate) text_prefix: String,
    pub(crate) max_batch_size: usize,
}

impl Settings {
    /// Prepend the kind-specific prefix to every input.
    pub(crate) fn prefixed(&self, inputs: &[&str], kind: EmbedKind) -> Vec<String> {
        let prefix = match kind {
            EmbedKind::Query => &self.query_prefix,
            EmbedKind::Text => &self.text_prefix,
        };
        inputs.iter().map(|s| format!("{prefix}{s}")).collect()
    }
}
