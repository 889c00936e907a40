use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by callers that only care which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Dial,
    Handshake,
    ProtocolConsistency,
    Transport,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot use proxy scheme {0:?} with a spoofed handshake")]
    UnsupportedProxyScheme(String),

    #[error("unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL {0:?} has no host")]
    MissingHost(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    #[error("dial {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("proxy server {proxy} returned {status:?}")]
    ProxyStatus { proxy: String, status: String },

    #[error("malformed CONNECT response from {proxy}: {reason}")]
    ProxyResponse { proxy: String, reason: String },

    #[error("proxy {proxy} sent {extra} byte(s) past the CONNECT response")]
    TunnelIntegrity { proxy: String, extra: usize },

    #[error("socks5 proxy {proxy}: {reason}")]
    Socks { proxy: String, reason: String },

    #[error("proxy negotiation I/O: {0}")]
    Io(#[from] io::Error),

    #[error("TLS handshake with {server}: {reason}")]
    Handshake { server: String, reason: String },

    #[error("TLS setup: {0}")]
    TlsSetup(#[from] boring::error::ErrorStack),

    #[error("no server name could be derived from {0:?}")]
    ServerName(String),

    #[error("unexpected switch from ALPN {expected:?} to {actual:?}")]
    ProtocolMismatch { expected: String, actual: String },

    #[error("http: {0}")]
    Http(#[from] hyper::Error),

    #[error("http request: {0}")]
    Request(#[from] http::Error),

    #[error("plain http transport: {0}")]
    Plain(#[from] reqwest::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedProxyScheme(_)
            | Error::UnsupportedScheme(_)
            | Error::InvalidUrl(_)
            | Error::MissingHost(_)
            | Error::InvalidHeader(_) => ErrorKind::Configuration,
            Error::Connect { .. }
            | Error::ProxyStatus { .. }
            | Error::ProxyResponse { .. }
            | Error::TunnelIntegrity { .. }
            | Error::Socks { .. }
            | Error::Io(_) => ErrorKind::Dial,
            Error::Handshake { .. } | Error::TlsSetup(_) | Error::ServerName(_) => {
                ErrorKind::Handshake
            }
            Error::ProtocolMismatch { .. } => ErrorKind::ProtocolConsistency,
            Error::Http(_) | Error::Request(_) | Error::Plain(_) => ErrorKind::Transport,
        }
    }
}
