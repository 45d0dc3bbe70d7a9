use crate::config::EmbedKind;
use crate::error::Result;

/// Embedder converts text into dense float32 vectors.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Return one vector per input, in input order.
    /// Implementations may split large inputs into several API calls.
    async fn embed(&self, inputs: &[&str], kind: EmbedKind) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        single(self.embed(&[query], EmbedKind::Query).await?)
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        single(self.embed(&[text], EmbedKind::Text).await?)
    }

    async fn embed_queries(&self, queries: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed(queries, EmbedKind::Query).await
    }

    async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts, EmbedKind::Text).await
    }
}

/// Blocking counterpart of [`Embedder`].
pub trait BlockingEmbedder: Send + Sync {
    fn embed(&self, inputs: &[&str], kind: EmbedKind) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        single(self.embed(&[query], EmbedKind::Query)?)
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        single(self.embed(&[text], EmbedKind::Text)?)
    }

    fn embed_queries(&self, queries: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed(queries, EmbedKind::Query)
    }

    fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts, EmbedKind::Text)
    }
}

fn single(vecs: Vec<Vec<f32>>) -> Result<Vec<f32>> {
    let actual = vecs.len();
    match <[Vec<f32>; 1]>::try_from(vecs) {
        Ok([v]) => Ok(v),
        Err(_) => Err(crate::error::EmbedError::BatchSizeMismatch {
            expected: 1,
            actual,
        }),
    }
}
