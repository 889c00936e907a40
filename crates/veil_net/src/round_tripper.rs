use async_trait::async_trait;
use hyper::body::HttpBody;
use hyper::header::{HeaderValue, USER_AGENT};
use hyper::service::Service;
use hyper::{Body, Request, Response, Uri};
use parking_lot::Mutex;
use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;
use veil_traits::RoundTrip;

use crate::error::{Error, Result};
use crate::options::ProfileOptions;
use crate::proxy::build_dialer;
use crate::tls::{BoringImpersonator, HandshakeEngine, TlsConnection, TlsImpersonator};
use crate::transport::{Authority, Dialer, DirectDialer};

/// Pool and timeout settings applied to every inner engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportDefaults {
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    /// Applied by the plain-HTTP transport.
    pub connect_timeout: Duration,
}

/// Process-wide template. Never mutated; each round tripper works on a copy.
pub const TRANSPORT_DEFAULTS: TransportDefaults = TransportDefaults {
    pool_idle_timeout: Duration::from_secs(90),
    pool_max_idle_per_host: 100,
    connect_timeout: Duration::from_secs(30),
};

impl Default for TransportDefaults {
    fn default() -> Self {
        TRANSPORT_DEFAULTS
    }
}

/// Which inner engine the first HTTPS handshake selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// HTTP/2, many streams over one connection.
    Multiplexed,
    /// HTTP/1.1, one request in flight per connection.
    Sequential,
}

struct Binding {
    kind: EngineKind,
    client: hyper::Client<BootstrapConnector, Body>,
    connector: Arc<ConnectorState>,
}

/// Drops the bootstrap connection if the request that created it ends without claiming it.
struct ReleaseBootstrap<'a>(&'a ConnectorState);

impl Drop for ReleaseBootstrap<'_> {
    fn drop(&mut self) {
        if let Some((addr, _)) = self.0.bootstrap.lock().take() {
            debug!("Closing unclaimed bootstrap connection to {}", addr);
        }
    }
}

/// Executes HTTP requests with a browser-like handshake, adapting to the protocol it negotiates.
pub struct RoundTripper {
    engine: HandshakeEngine,
    dialer: Arc<dyn Dialer>,
    proxy_url: Option<Url>,
    user_agent: HeaderValue,
    defaults: TransportDefaults,
    plain: reqwest::Client,
    binding: OnceCell<Binding>,
}

impl RoundTripper {
    pub fn new(options: ProfileOptions) -> Result<Self> {
        let profile = Arc::new(options.identity.profile());
        let impersonator = BoringImpersonator::new(profile, &options.tls)?;
        Self::with_impersonator(options, Arc::new(impersonator))
    }

    /// Builds a round tripper around a caller-provided handshake layer.
    pub fn with_impersonator(
        options: ProfileOptions,
        impersonator: Arc<dyn TlsImpersonator>,
    ) -> Result<Self> {
        let defaults = TRANSPORT_DEFAULTS;
        let engine = HandshakeEngine::new(impersonator, options.tls.server_name.clone());
        let base = options
            .base_dialer
            .clone()
            .unwrap_or_else(|| Arc::new(DirectDialer));
        let (dialer, proxy_url) = build_dialer(&options.proxy, base, &engine)?;
        let user_agent = HeaderValue::from_str(options.effective_user_agent())?;

        let mut plain = reqwest::Client::builder()
            .connect_timeout(defaults.connect_timeout)
            .pool_idle_timeout(defaults.pool_idle_timeout)
            .pool_max_idle_per_host(defaults.pool_max_idle_per_host)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(options.tls.insecure_skip_verify);
        plain = match &proxy_url {
            Some(url) => plain.proxy(reqwest::Proxy::all(url.as_str())?),
            None => plain.no_proxy(),
        };

        debug!(
            "Round tripper ready: identity {}, proxy {:?}",
            options.identity,
            proxy_url.as_ref().map(Url::as_str)
        );

        Ok(Self {
            engine,
            dialer,
            proxy_url,
            user_agent,
            defaults,
            plain: plain.build()?,
            binding: OnceCell::new(),
        })
    }

    /// Effective proxy URL, `None` when connecting directly.
    pub fn proxy_url(&self) -> Option<&Url> {
        self.proxy_url.as_ref()
    }

    /// The bound HTTPS engine, `None` until the first HTTPS request succeeds in bootstrapping.
    pub fn engine_kind(&self) -> Option<EngineKind> {
        self.binding.get().map(|b| b.kind)
    }

    pub async fn execute(&self, mut req: Request<Body>) -> Result<Response<Body>> {
        if !req.headers().contains_key(USER_AGENT) {
            req.headers_mut().insert(USER_AGENT, self.user_agent.clone());
        }

        match req.uri().scheme_str() {
            Some("http") => self.plain_round_trip(req).await,
            Some("https") => {
                let (binding, bootstrapped) = self.binding(req.uri()).await?;
                let _release =
                    bootstrapped.then(|| ReleaseBootstrap(binding.connector.as_ref()));
                binding.client.request(req).await.map_err(lift_dial_error)
            }
            other => Err(Error::UnsupportedScheme(other.unwrap_or_default().to_string())),
        }
    }

    /// The bound engine, plus whether this call performed the bootstrap.
    async fn binding(&self, uri: &Uri) -> Result<(&Binding, bool)> {
        let mut bootstrapped = false;
        let binding = self
            .binding
            .get_or_try_init(|| {
                bootstrapped = true;
                self.bootstrap(uri)
            })
            .await?;
        Ok((binding, bootstrapped))
    }

    async fn bootstrap(&self, uri: &Uri) -> Result<Binding> {
        let addr = Authority::from_uri(uri)?;
        let conn = self.engine.connect(self.dialer.as_ref(), &addr).await?;
        let kind = if conn.is_h2() {
            EngineKind::Multiplexed
        } else {
            EngineKind::Sequential
        };
        info!(
            "Bound {:?} engine after {} negotiated {:?}",
            kind,
            addr,
            conn.negotiated_protocol()
        );

        let state = Arc::new(ConnectorState {
            engine: self.engine.clone(),
            dialer: self.dialer.clone(),
            expected: conn.negotiated_protocol().to_string(),
            bootstrap: Mutex::new(Some((addr, conn))),
        });
        let connector = BootstrapConnector {
            inner: state.clone(),
        };

        let mut builder = hyper::Client::builder();
        builder
            .pool_idle_timeout(self.defaults.pool_idle_timeout)
            .pool_max_idle_per_host(self.defaults.pool_max_idle_per_host);
        if kind == EngineKind::Multiplexed {
            builder.http2_only(true);
        }

        Ok(Binding {
            kind,
            client: builder.build(connector),
            connector: state,
        })
    }

    async fn plain_round_trip(&self, req: Request<Body>) -> Result<Response<Body>> {
        let (parts, body) = req.into_parts();
        let mut outbound = self
            .plain
            .request(parts.method, parts.uri.to_string())
            .version(parts.version)
            .headers(parts.headers);

        if !body.is_end_stream() {
            outbound = match body.size_hint().exact() {
                Some(_) => outbound.body(hyper::body::to_bytes(body).await?),
                None => outbound.body(reqwest::Body::wrap_stream(body)),
            };
        }

        let resp = outbound.send().await?;
        let mut builder = Response::builder()
            .status(resp.status())
            .version(resp.version());
        if let Some(headers) = builder.headers_mut() {
            *headers = resp.headers().clone();
        }
        Ok(builder.body(Body::wrap_stream(resp.bytes_stream()))?)
    }
}

#[async_trait]
impl RoundTrip for RoundTripper {
    async fn round_trip(&self, req: Request<Body>) -> anyhow::Result<Response<Body>> {
        Ok(self.execute(req).await?)
    }
}

/// Unwraps the dial error an inner engine reported as a connect failure.
fn lift_dial_error(err: hyper::Error) -> Error {
    let ours = StdError::source(&err).map_or(false, |cause| cause.is::<Error>());
    if !ours {
        return Error::Http(err);
    }
    match err.into_cause().map(|cause| cause.downcast::<Error>()) {
        Some(Ok(inner)) => *inner,
        Some(Err(other)) => Error::Io(io::Error::new(io::ErrorKind::Other, other)),
        None => Error::Io(io::Error::new(io::ErrorKind::Other, "connect failed")),
    }
}

struct ConnectorState {
    engine: HandshakeEngine,
    dialer: Arc<dyn Dialer>,
    expected: String,
    bootstrap: Mutex<Option<(Authority, TlsConnection)>>,
}

impl ConnectorState {
    async fn connect(&self, uri: Uri) -> Result<TlsConnection> {
        let addr = Authority::from_uri(&uri)?;

        let reused = {
            let mut slot = self.bootstrap.lock();
            match slot.as_ref() {
                Some((bound, _)) if *bound == addr => slot.take().map(|(_, conn)| conn),
                _ => None,
            }
        };
        if let Some(conn) = reused {
            debug!("Handing bootstrap connection for {} to the engine", addr);
            return Ok(conn);
        }

        let conn = self.engine.connect(self.dialer.as_ref(), &addr).await?;
        if conn.negotiated_protocol() != self.expected {
            warn!(
                "{} negotiated {:?} after the engine was bound to {:?}",
                addr,
                conn.negotiated_protocol(),
                self.expected
            );
            return Err(Error::ProtocolMismatch {
                expected: self.expected.clone(),
                actual: conn.negotiated_protocol().to_string(),
            });
        }
        Ok(conn)
    }
}

/// Dial callback shared by both engines.
#[derive(Clone)]
struct BootstrapConnector {
    inner: Arc<ConnectorState>,
}

impl Service<Uri> for BootstrapConnector {
    type Response = TlsConnection;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<TlsConnection>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let state = self.inner.clone();
        Box::pin(async move { state.connect(uri).await })
    }
}
