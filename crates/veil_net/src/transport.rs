use async_trait::async_trait;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Protocol-agnostic byte stream handed between dialer layers.
pub type BoxedStream = Box<dyn RawStream>;

pub trait RawStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> RawStream for T {}

/// A `host:port` pair suitable for dialing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Authority {
    pub host: String,
    pub port: u16,
}

impl Authority {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .map(str::to_string)
            .unwrap_or(host);
        Self { host, port }
    }

    /// Extracts the dial address from a URL, defaulting the port by scheme.
    pub fn from_url(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::MissingHost(url.to_string()))?;
        let port = match url.port() {
            Some(port) => port,
            None => default_port(url.scheme())
                .ok_or_else(|| Error::UnsupportedScheme(url.scheme().to_string()))?,
        };
        Ok(Self::new(host, port))
    }

    /// Same as [`Authority::from_url`] for an `http::Uri`.
    pub fn from_uri(uri: &http::Uri) -> Result<Self> {
        let scheme = uri.scheme_str().unwrap_or_default();
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::MissingHost(uri.to_string()))?;
        let port = match uri.port_u16() {
            Some(port) => port,
            None => default_port(scheme).ok_or_else(|| Error::UnsupportedScheme(scheme.to_string()))?,
        };
        Ok(Self::new(host, port))
    }

    pub fn is_ip(&self) -> bool {
        self.host.parse::<IpAddr>().is_ok()
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// One layer of a dialer chain. Implementations must be safe to share across concurrent dials.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, addr: &Authority) -> Result<BoxedStream>;
}

/// Innermost layer: a plain TCP connect to each resolved address in turn.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDialer;

#[async_trait]
impl Dialer for DirectDialer {
    async fn dial(&self, addr: &Authority) -> Result<BoxedStream> {
        let stream = TransportBuilder::connect(addr).await?;
        Ok(Box::new(stream))
    }
}

pub struct TransportBuilder;

impl TransportBuilder {
    /// Resolves `addr` and connects to the first address that accepts.
    pub async fn connect(addr: &Authority) -> Result<TcpStream> {
        let candidates = tokio::net::lookup_host((addr.host.as_str(), addr.port))
            .await
            .map_err(|source| Error::Connect {
                addr: addr.to_string(),
                source,
            })?;

        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
        for candidate in candidates {
            match Self::connect_socket(candidate).await {
                Ok(stream) => {
                    debug!("Connected to {} via {}", addr, candidate);
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("Connect to {} ({}) failed: {}", addr, candidate, e);
                    last_err = e;
                }
            }
        }

        Err(Error::Connect {
            addr: addr.to_string(),
            source: last_err,
        })
    }

    /// Pre-flight socket configuration happens before any packet leaves the host.
    async fn connect_socket(addr: SocketAddr) -> io::Result<TcpStream> {
        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nodelay(true)?;
        socket.set_keepalive(true)?;
        socket.set_nonblocking(true)?;

        match socket.connect(&SockAddr::from(addr)) {
            Ok(()) => {}
            Err(e) if connect_in_progress(&e) => {}
            Err(e) => return Err(e),
        }

        let std_stream: std::net::TcpStream = socket.into();
        let stream = TcpStream::from_std(std_stream)?;

        // Writable once the handshake settles; SO_ERROR tells which way it went.
        stream.writable().await?;
        if let Some(e) = stream.take_error()? {
            return Err(e);
        }
        stream.peer_addr()?;
        Ok(stream)
    }
}

fn connect_in_progress(e: &io::Error) -> bool {
    #[cfg(unix)]
    if e.raw_os_error() == Some(libc::EINPROGRESS) {
        return true;
    }
    e.kind() == io::ErrorKind::WouldBlock
}
