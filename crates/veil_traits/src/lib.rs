use async_trait::async_trait;
use hyper::{Body, Request, Response};
use std::sync::Arc;

/// A single HTTP exchange executor that a generic client plugs in as its transport.
///
/// Response bodies are streamed lazily; dropping the body releases the
/// underlying connection back to whichever pool produced it.
#[async_trait]
pub trait RoundTrip: Send + Sync {
    /// Executes one request end-to-end and returns the response head with a streaming body.
    async fn round_trip(&self, req: Request<Body>) -> anyhow::Result<Response<Body>>;
}

#[async_trait]
impl<T: RoundTrip + ?Sized> RoundTrip for Arc<T> {
    async fn round_trip(&self, req: Request<Body>) -> anyhow::Result<Response<Body>> {
        (**self).round_trip(req).await
    }
}
