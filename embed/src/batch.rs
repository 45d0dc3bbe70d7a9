//! Batching and reassembly shared by the async and blocking clients.

use crate::error::{EmbedError, Result};
use crate::transport::{BatchRequest, BlockingTransport, Transport};

/// Split `items` into contiguous batches of at most `max_size` elements.
///
/// An empty input yields no batches. Panics if `max_size` is zero.
pub fn chunk<T>(items: &[T], max_size: usize) -> Vec<&[T]> {
    items.chunks(max_size).collect()
}

/// Send `inputs` in batches of `max_batch_size`, one request at a time,
/// and concatenate the results in input order.
///
/// The first failing batch aborts the whole call.
pub(crate) async fn dispatch<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    api_token: Option<&str>,
    inputs: &[String],
    max_batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let batches = chunk(inputs, max_batch_size);
    let total = batches.len();
    let mut result = Vec::with_capacity(inputs.len());

    for (i, batch) in batches.into_iter().enumerate() {
        tracing::debug!(
            url,
            batch = i + 1,
            total,
            size = batch.len(),
            "embedding batch"
        );
        let req = BatchRequest {
            url,
            api_token,
            inputs: batch,
        };
        let vecs = transport.post_batch(&req).await?;
        if vecs.len() != batch.len() {
            return Err(EmbedError::BatchSizeMismatch {
                expected: batch.len(),
                actual: vecs.len(),
            });
        }
        result.extend(vecs);
    }
    Ok(result)
}

/// Runs a [`BlockingTransport`] through [`dispatch`]; the future it
/// returns is always ready once the blocking call finishes.
pub(crate) struct Blocking<'a, T: ?Sized>(pub(crate) &'a T);

#[async_trait::async_trait]
impl<'a, T: BlockingTransport + ?Sized> Transport for Blocking<'a, T> {
    async fn post_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<Vec<f32>>> {
        self.0.post_batch(req)
    }
}

/// Blocking form of [`dispatch`].
pub(crate) fn dispatch_blocking<T: BlockingTransport + ?Sized>(
    transport: &T,
    url: &str,
    api_token: Option<&str>,
    inputs: &[String],
    max_batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    futures::executor::block_on(dispatch(
        &Blocking(transport),
        url,
        api_token,
        inputs,
        max_batch_size,
    ))
}
