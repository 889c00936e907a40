pub mod config;

use anyhow::{Context, Result};
use hyper::{Body, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use veil_net::{ProfileOptions, RoundTripper};
use veil_traits::RoundTrip;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request convenience layer over any [`RoundTrip`] transport.
///
/// The timeout bounds the wait for the response head; the body streams afterwards.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn RoundTrip>,
    timeout: Duration,
}

impl Client {
    /// Wraps `transport`, or a default [`RoundTripper`] when none is given.
    pub fn new(transport: Option<Arc<dyn RoundTrip>>) -> Result<Self> {
        let transport = match transport {
            Some(transport) => transport,
            None => Arc::new(RoundTripper::new(ProfileOptions::default())?),
        };
        Ok(Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn get(&self, url: &str) -> Result<Response<Body>> {
        let req = Request::get(url)
            .body(Body::empty())
            .with_context(|| format!("building request for {url}"))?;
        self.execute(req).await
    }

    pub async fn execute(&self, req: Request<Body>) -> Result<Response<Body>> {
        let target = req.uri().to_string();
        tracing::debug!("{} {}", req.method(), target);
        tokio::time::timeout(self.timeout, self.transport.round_trip(req))
            .await
            .with_context(|| format!("{target}: no response within {:?}", self.timeout))?
    }
}
