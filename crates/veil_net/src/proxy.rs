use async_trait::async_trait;
use base64::Engine;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::tls::{HandshakeEngine, TlsDialer};
use crate::transport::{Authority, BoxedStream, Dialer};

/// Upper bound on a CONNECT response head.
const MAX_RESPONSE_HEAD: usize = 16 * 1024;

/// Proxy setting as handed in by the caller. Resolved once, at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxySpec {
    #[default]
    None,
    Text(String),
    Url(Url),
    Descriptor(ProxyDescriptor),
}

impl ProxySpec {
    /// Normalizes the setting into a descriptor; `None` means a direct connection.
    pub fn resolve(&self) -> Result<Option<ProxyDescriptor>> {
        match self {
            ProxySpec::None => Ok(None),
            ProxySpec::Text(text) if text.trim().is_empty() => Ok(None),
            ProxySpec::Text(text) => ProxyDescriptor::from_url(&Url::parse(text.trim())?).map(Some),
            ProxySpec::Url(url) => ProxyDescriptor::from_url(url).map(Some),
            ProxySpec::Descriptor(desc) => Ok(Some(desc.clone())),
        }
    }
}

impl From<&str> for ProxySpec {
    fn from(text: &str) -> Self {
        ProxySpec::Text(text.to_string())
    }
}

impl From<String> for ProxySpec {
    fn from(text: String) -> Self {
        ProxySpec::Text(text)
    }
}

impl From<Url> for ProxySpec {
    fn from(url: Url) -> Self {
        ProxySpec::Url(url)
    }
}

impl From<ProxyDescriptor> for ProxySpec {
    fn from(desc: ProxyDescriptor) -> Self {
        ProxySpec::Descriptor(desc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyScheme {
    Socks5,
    Http,
    Https,
}

impl ProxyScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyScheme::Socks5 => "socks5",
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
        }
    }
}

impl fmt::Display for ProxyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ProxyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub scheme: ProxyScheme,
    pub addr: Authority,
    pub auth: Option<ProxyAuth>,
}

impl ProxyDescriptor {
    pub fn from_url(url: &Url) -> Result<Self> {
        let addr = Authority::from_url(url)?;
        let scheme = match url.scheme() {
            "socks5" => ProxyScheme::Socks5,
            "http" => ProxyScheme::Http,
            "https" => ProxyScheme::Https,
            other => return Err(Error::UnsupportedProxyScheme(other.to_string())),
        };
        let auth = (!url.username().is_empty()).then(|| ProxyAuth {
            username: decode_userinfo(url.username()),
            password: url.password().map(decode_userinfo).unwrap_or_default(),
        });
        Ok(Self { scheme, addr, auth })
    }

    pub fn to_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}://{}", self.scheme, self.addr))?;
        if let Some(auth) = &self.auth {
            // Only cannot-be-a-base URLs reject credentials.
            let _ = url.set_username(&auth.username);
            if !auth.password.is_empty() {
                let _ = url.set_password(Some(&auth.password));
            }
        }
        Ok(url)
    }
}

fn decode_userinfo(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Resolves `spec` into a dialer chain on top of `base`.
///
/// Returns the outermost dialer and the effective proxy URL (`None` when direct).
pub fn build_dialer(
    spec: &ProxySpec,
    base: Arc<dyn Dialer>,
    engine: &HandshakeEngine,
) -> Result<(Arc<dyn Dialer>, Option<Url>)> {
    let desc = match spec.resolve()? {
        Some(desc) => desc,
        None => return Ok((base, None)),
    };
    let url = match spec {
        ProxySpec::Url(url) => url.clone(),
        _ => desc.to_url()?,
    };
    debug!("Routing through {} proxy at {}", desc.scheme, desc.addr);

    let dialer: Arc<dyn Dialer> = match desc.scheme {
        ProxyScheme::Socks5 => Arc::new(Socks5Dialer::new(desc.addr, desc.auth, base)),
        ProxyScheme::Http => Arc::new(HttpConnectDialer::new(desc.addr, desc.auth, base)),
        ProxyScheme::Https => {
            let tls = Arc::new(TlsDialer::new(engine.for_proxy(), base));
            Arc::new(HttpConnectDialer::new(desc.addr, desc.auth, tls))
        }
    };
    Ok((dialer, Some(url)))
}

/// HTTP `CONNECT` tunnel through a proxy reached via `forward`.
pub struct HttpConnectDialer {
    proxy: Authority,
    auth: Option<ProxyAuth>,
    forward: Arc<dyn Dialer>,
}

impl HttpConnectDialer {
    pub fn new(proxy: Authority, auth: Option<ProxyAuth>, forward: Arc<dyn Dialer>) -> Self {
        Self {
            proxy,
            auth,
            forward,
        }
    }

    fn connect_request(&self, target: &Authority) -> String {
        let mut req = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n");
        if let Some(auth) = &self.auth {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", auth.username, auth.password));
            req.push_str(&format!("Proxy-Authorization: Basic {token}\r\n"));
        }
        req.push_str("\r\n");
        req
    }
}

#[async_trait]
impl Dialer for HttpConnectDialer {
    async fn dial(&self, addr: &Authority) -> Result<BoxedStream> {
        let mut stream = self.forward.dial(&self.proxy).await?;
        stream.write_all(self.connect_request(addr).as_bytes()).await?;
        stream.flush().await?;

        let proxy = self.proxy.to_string();
        let mut buf = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];
        let head_len = loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(Error::ProxyResponse {
                    proxy,
                    reason: "connection closed before the response head".into(),
                });
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find_head_end(&buf) {
                break pos;
            }
            if buf.len() > MAX_RESPONSE_HEAD {
                return Err(Error::ProxyResponse {
                    proxy,
                    reason: "response head too large".into(),
                });
            }
        };

        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut headers);
        match resp.parse(&buf[..head_len]) {
            Ok(httparse::Status::Complete(_)) => {}
            Ok(httparse::Status::Partial) => {
                return Err(Error::ProxyResponse {
                    proxy,
                    reason: "incomplete response head".into(),
                })
            }
            Err(e) => {
                return Err(Error::ProxyResponse {
                    proxy,
                    reason: e.to_string(),
                })
            }
        }

        let code = resp.code.unwrap_or_default();
        if code != 200 {
            let status = format!("{} {}", code, resp.reason.unwrap_or_default());
            debug!("Proxy {} refused CONNECT {}: {}", proxy, addr, status.trim_end());
            return Err(Error::ProxyStatus {
                proxy,
                status: status.trim_end().to_string(),
            });
        }

        let extra = buf.len() - head_len;
        if extra != 0 {
            warn!("Proxy {} sent {} byte(s) past the CONNECT response, dropping tunnel", proxy, extra);
            return Err(Error::TunnelIntegrity { proxy, extra });
        }

        debug!("CONNECT tunnel to {} established via {}", addr, proxy);
        Ok(stream)
    }
}

/// Offset just past the blank line ending the response head.
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

const SOCKS_VERSION: u8 = 0x05;
const SOCKS_AUTH_NONE: u8 = 0x00;
const SOCKS_AUTH_PASSWORD: u8 = 0x02;
const SOCKS_NO_ACCEPTABLE: u8 = 0xff;
const SOCKS_CMD_CONNECT: u8 = 0x01;
const SOCKS_ATYP_IPV4: u8 = 0x01;
const SOCKS_ATYP_DOMAIN: u8 = 0x03;
const SOCKS_ATYP_IPV6: u8 = 0x04;

/// SOCKS5 `CONNECT` client (RFC 1928, RFC 1929 password auth).
pub struct Socks5Dialer {
    proxy: Authority,
    auth: Option<ProxyAuth>,
    forward: Arc<dyn Dialer>,
}

impl Socks5Dialer {
    pub fn new(proxy: Authority, auth: Option<ProxyAuth>, forward: Arc<dyn Dialer>) -> Self {
        Self {
            proxy,
            auth,
            forward,
        }
    }

    fn failure(&self, reason: impl Into<String>) -> Error {
        Error::Socks {
            proxy: self.proxy.to_string(),
            reason: reason.into(),
        }
    }

    async fn authenticate(&self, stream: &mut BoxedStream) -> Result<()> {
        let greeting: &[u8] = if self.auth.is_some() {
            &[SOCKS_VERSION, 2, SOCKS_AUTH_NONE, SOCKS_AUTH_PASSWORD]
        } else {
            &[SOCKS_VERSION, 1, SOCKS_AUTH_NONE]
        };
        stream.write_all(greeting).await?;

        let mut reply = [0u8; 2];
        stream.read_exact(&mut reply).await?;
        if reply[0] != SOCKS_VERSION {
            return Err(self.failure(format!("unexpected protocol version {}", reply[0])));
        }

        match (reply[1], &self.auth) {
            (SOCKS_AUTH_NONE, _) => Ok(()),
            (SOCKS_AUTH_PASSWORD, Some(auth)) => {
                let user = auth.username.as_bytes();
                let pass = auth.password.as_bytes();
                if user.len() > 255 || pass.len() > 255 {
                    return Err(self.failure("credentials longer than 255 bytes"));
                }
                let mut msg = Vec::with_capacity(3 + user.len() + pass.len());
                msg.push(0x01);
                msg.push(user.len() as u8);
                msg.extend_from_slice(user);
                msg.push(pass.len() as u8);
                msg.extend_from_slice(pass);
                stream.write_all(&msg).await?;

                let mut status = [0u8; 2];
                stream.read_exact(&mut status).await?;
                if status[1] != 0x00 {
                    return Err(self.failure("username/password authentication failed"));
                }
                Ok(())
            }
            (SOCKS_NO_ACCEPTABLE, _) => Err(self.failure("no acceptable authentication methods")),
            (method, _) => Err(self.failure(format!("unsupported authentication method {method}"))),
        }
    }

    fn connect_request(&self, target: &Authority) -> Result<Vec<u8>> {
        let mut msg = vec![SOCKS_VERSION, SOCKS_CMD_CONNECT, 0x00];
        match target.host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => {
                msg.push(SOCKS_ATYP_IPV4);
                msg.extend_from_slice(&ip.octets());
            }
            Ok(IpAddr::V6(ip)) => {
                msg.push(SOCKS_ATYP_IPV6);
                msg.extend_from_slice(&ip.octets());
            }
            Err(_) => {
                let host = target.host.as_bytes();
                if host.is_empty() || host.len() > 255 {
                    return Err(self.failure(format!("cannot address host {:?}", target.host)));
                }
                msg.push(SOCKS_ATYP_DOMAIN);
                msg.push(host.len() as u8);
                msg.extend_from_slice(host);
            }
        }
        msg.extend_from_slice(&target.port.to_be_bytes());
        Ok(msg)
    }
}

#[async_trait]
impl Dialer for Socks5Dialer {
    async fn dial(&self, addr: &Authority) -> Result<BoxedStream> {
        let request = self.connect_request(addr)?;
        let mut stream = self.forward.dial(&self.proxy).await?;
        self.authenticate(&mut stream).await?;
        stream.write_all(&request).await?;

        let mut head = [0u8; 4];
        stream.read_exact(&mut head).await?;
        if head[0] != SOCKS_VERSION {
            return Err(self.failure(format!("unexpected protocol version {}", head[0])));
        }
        if head[1] != 0x00 {
            return Err(self.failure(reply_reason(head[1])));
        }

        // Bound address and port; nothing here is needed for a CONNECT.
        let skip = match head[3] {
            SOCKS_ATYP_IPV4 => 4 + 2,
            SOCKS_ATYP_IPV6 => 16 + 2,
            SOCKS_ATYP_DOMAIN => {
                let mut len = [0u8; 1];
                stream.read_exact(&mut len).await?;
                len[0] as usize + 2
            }
            other => return Err(self.failure(format!("unknown address type {other}"))),
        };
        let mut bound = vec![0u8; skip];
        stream.read_exact(&mut bound).await?;

        debug!("SOCKS5 tunnel to {} established via {}", addr, self.proxy);
        Ok(stream)
    }
}

fn reply_reason(code: u8) -> String {
    match code {
        0x01 => "general server failure".into(),
        0x02 => "connection not allowed by ruleset".into(),
        0x03 => "network unreachable".into(),
        0x04 => "host unreachable".into(),
        0x05 => "connection refused".into(),
        0x06 => "TTL expired".into(),
        0x07 => "command not supported".into(),
        0x08 => "address type not supported".into(),
        other => format!("unknown reply code {other}"),
    }
}
