use async_trait::async_trait;
use boring::ssl::{
    CertificateCompressionAlgorithm, CertificateCompressor, SslConnector, SslConnectorBuilder,
    SslMethod, SslVerifyMode, SslVersion,
};
use boring::x509::X509;
use hyper::client::connect::{Connected, Connection};
use std::fmt;
use std::io::{self, Read, Write};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::profile::{
    is_grease, ClientHelloProfile, Extension, CERT_COMPRESSION_BROTLI, CERT_COMPRESSION_ZLIB,
    VERSION_TLS10, VERSION_TLS11, VERSION_TLS12,
    VERSION_TLS13,
};
use crate::transport::{Authority, BoxedStream, Dialer};

/// ALPN token that selects the multiplexed engine.
pub const ALPN_H2: &str = "h2";

/// Per-instance overrides layered over the identity's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// Server name sent in SNI and verified against the certificate. Derived from the dial host when unset.
    pub server_name: Option<String>,
    pub insecure_skip_verify: bool,
    /// PEM bundle of additional trust anchors.
    pub root_certificates: Option<Vec<u8>>,
}

/// An established TLS session that can report the negotiated application protocol.
pub trait TlsSession: AsyncRead + AsyncWrite + Unpin + Send {
    fn negotiated_protocol(&self) -> Option<&[u8]>;
}

impl<S> TlsSession for tokio_boring::SslStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn negotiated_protocol(&self) -> Option<&[u8]> {
        self.ssl().selected_alpn_protocol()
    }
}

/// Handshake layer the engine delegates the record layer to.
#[async_trait]
pub trait TlsImpersonator: Send + Sync {
    fn profile(&self) -> &ClientHelloProfile;

    /// Runs the client handshake over `stream`.
    ///
    /// `server_name` goes into SNI when present; `verify_name` is what the
    /// certificate is checked against when there is no server name.
    async fn handshake(
        &self,
        stream: BoxedStream,
        server_name: Option<&str>,
        verify_name: &str,
    ) -> Result<Box<dyn TlsSession>>;
}

/// BoringSSL provider configured from a [`ClientHelloProfile`].
///
/// The connector is built once and only read afterwards; the server name is
/// a per-handshake argument, so one instance serves every layer of a chain.
pub struct BoringImpersonator {
    profile: Arc<ClientHelloProfile>,
    connector: SslConnector,
    verify: bool,
}

impl BoringImpersonator {
    pub fn new(profile: Arc<ClientHelloProfile>, config: &TlsConfig) -> Result<Self> {
        let mut builder = SslConnector::builder(SslMethod::tls())?;

        builder.set_min_proto_version(ssl_version(profile.min_version()))?;
        builder.set_max_proto_version(ssl_version(profile.max_version()))?;

        let ciphers = cipher_list(profile.cipher_suites());
        if !ciphers.is_empty() {
            builder.set_cipher_list(&ciphers)?;
        }
        let curves = curves_list(profile.supported_groups());
        if !curves.is_empty() {
            builder.set_curves_list(&curves)?;
        }
        let sigalgs = sigalgs_list(profile.signature_algorithms());
        if !sigalgs.is_empty() {
            builder.set_sigalgs_list(&sigalgs)?;
        }
        let alpn = alpn_wire(profile.alpn_protocols());
        if !alpn.is_empty() {
            builder.set_alpn_protos(&alpn)?;
        }

        builder.set_grease_enabled(profile.uses_grease());
        if profile.extensions().contains(&Extension::StatusRequest) {
            builder.enable_ocsp_stapling();
        }
        if profile.extensions().contains(&Extension::SignedCertificateTimestamp) {
            builder.enable_signed_cert_timestamps();
        }
        register_cert_compression(&mut builder, profile.cert_compression_algorithms())?;

        if let Some(pem) = &config.root_certificates {
            for cert in X509::stack_from_pem(pem)? {
                builder.cert_store_mut().add_cert(cert)?;
            }
        }
        if config.insecure_skip_verify {
            builder.set_verify(SslVerifyMode::NONE);
        }

        debug!(
            "Handshake layer configured for {} (ciphers: {}, groups: {})",
            profile.identity(),
            ciphers,
            curves
        );

        Ok(Self {
            profile,
            connector: builder.build(),
            verify: !config.insecure_skip_verify,
        })
    }
}

#[async_trait]
impl TlsImpersonator for BoringImpersonator {
    fn profile(&self) -> &ClientHelloProfile {
        &self.profile
    }

    async fn handshake(
        &self,
        stream: BoxedStream,
        server_name: Option<&str>,
        verify_name: &str,
    ) -> Result<Box<dyn TlsSession>> {
        let mut config = self.connector.configure()?;
        config.set_use_server_name_indication(server_name.is_some());
        config.set_verify_hostname(self.verify);

        let domain = server_name.unwrap_or(verify_name);
        let tls = tokio_boring::connect(config, domain, Wire(stream))
            .await
            .map_err(|e| Error::Handshake {
                server: domain.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(tls))
    }
}

/// Dials through a dialer and performs the spoofed handshake.
#[derive(Clone)]
pub struct HandshakeEngine {
    impersonator: Arc<dyn TlsImpersonator>,
    server_name: Option<String>,
}

impl HandshakeEngine {
    pub fn new(impersonator: Arc<dyn TlsImpersonator>, server_name: Option<String>) -> Self {
        Self {
            impersonator,
            server_name: server_name.filter(|n| !n.is_empty()),
        }
    }

    /// Engine for the proxy-facing layer: same provider, SNI taken from the proxy host.
    pub fn for_proxy(&self) -> Self {
        Self {
            impersonator: self.impersonator.clone(),
            server_name: None,
        }
    }

    pub fn profile(&self) -> &ClientHelloProfile {
        self.impersonator.profile()
    }

    /// SNI for `addr`: the override, else the host name; IP literals get none.
    pub fn server_name_for(&self, addr: &Authority) -> Result<Option<String>> {
        if let Some(name) = &self.server_name {
            return Ok(Some(name.clone()));
        }
        let host = addr.host.trim_end_matches('.');
        if host.is_empty() {
            return Err(Error::ServerName(addr.to_string()));
        }
        Ok((!addr.is_ip()).then(|| host.to_string()))
    }

    pub async fn connect(&self, dialer: &dyn Dialer, addr: &Authority) -> Result<TlsConnection> {
        let server_name = self.server_name_for(addr)?;
        let stream = dialer.dial(addr).await?;
        debug!(
            "Starting {} handshake with {} (SNI: {:?})",
            self.profile().identity(),
            addr,
            server_name
        );
        let session = self
            .impersonator
            .handshake(stream, server_name.as_deref(), &addr.host)
            .await?;
        let conn = TlsConnection::new(session);
        debug!("Handshake with {} negotiated {:?}", addr, conn.negotiated_protocol());
        Ok(conn)
    }
}

/// Dialer layer that wraps every dial of `forward` in a spoofed handshake.
pub struct TlsDialer {
    engine: HandshakeEngine,
    forward: Arc<dyn Dialer>,
}

impl TlsDialer {
    pub fn new(engine: HandshakeEngine, forward: Arc<dyn Dialer>) -> Self {
        Self { engine, forward }
    }
}

#[async_trait]
impl Dialer for TlsDialer {
    async fn dial(&self, addr: &Authority) -> Result<BoxedStream> {
        let conn = self.engine.connect(self.forward.as_ref(), addr).await?;
        Ok(Box::new(conn))
    }
}

/// A secure connection plus the protocol its handshake negotiated.
pub struct TlsConnection {
    session: Box<dyn TlsSession>,
    protocol: String,
}

impl TlsConnection {
    pub fn new(session: Box<dyn TlsSession>) -> Self {
        let protocol = session
            .negotiated_protocol()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default();
        Self { session, protocol }
    }

    /// Negotiated ALPN token, empty when none was agreed.
    pub fn negotiated_protocol(&self) -> &str {
        &self.protocol
    }

    pub fn is_h2(&self) -> bool {
        self.protocol == ALPN_H2
    }
}

impl fmt::Debug for TlsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConnection")
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

impl Connection for TlsConnection {
    fn connected(&self) -> Connected {
        if self.is_h2() {
            Connected::new().negotiated_h2()
        } else {
            Connected::new()
        }
    }
}

impl AsyncRead for TlsConnection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.session).poll_read(cx, buf)
    }
}

impl AsyncWrite for TlsConnection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.session).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.session).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.session).poll_shutdown(cx)
    }
}

/// Boxed transport under a TLS session; `Debug` so handshake errors can render.
struct Wire(BoxedStream);

impl fmt::Debug for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Wire")
    }
}

impl AsyncRead for Wire {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl AsyncWrite for Wire {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_shutdown(cx)
    }
}

/// Offers certificate compression. The client only ever decompresses.
fn register_cert_compression(
    builder: &mut SslConnectorBuilder,
    algorithms: &[u16],
) -> Result<()> {
    for &algorithm in algorithms {
        match algorithm {
            CERT_COMPRESSION_BROTLI => builder.add_certificate_compression_algorithm(Brotli)?,
            CERT_COMPRESSION_ZLIB => builder.add_certificate_compression_algorithm(Zlib)?,
            other => debug!("Certificate compression {:#06x} has no decoder", other),
        }
    }
    Ok(())
}

struct Brotli;

impl CertificateCompressor for Brotli {
    const ALGORITHM: CertificateCompressionAlgorithm = CertificateCompressionAlgorithm::BROTLI;
    const CAN_COMPRESS: bool = false;
    const CAN_DECOMPRESS: bool = true;

    fn decompress<W>(&self, input: &[u8], output: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        brotli::BrotliDecompress(&mut io::Cursor::new(input), output)
    }
}

struct Zlib;

impl CertificateCompressor for Zlib {
    const ALGORITHM: CertificateCompressionAlgorithm = CertificateCompressionAlgorithm::ZLIB;
    const CAN_COMPRESS: bool = false;
    const CAN_DECOMPRESS: bool = true;

    fn decompress<W>(&self, input: &[u8], output: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        let mut decoded = Vec::new();
        flate2::read::ZlibDecoder::new(input).read_to_end(&mut decoded)?;
        output.write_all(&decoded)
    }
}

fn ssl_version(version: u16) -> Option<SslVersion> {
    match version {
        VERSION_TLS10 => Some(SslVersion::TLS1),
        VERSION_TLS11 => Some(SslVersion::TLS1_1),
        VERSION_TLS12 => Some(SslVersion::TLS1_2),
        VERSION_TLS13 => Some(SslVersion::TLS1_3),
        _ => None,
    }
}

/// TLS 1.2 suites by OpenSSL name. TLS 1.3 suites and GREASE are handled by BoringSSL itself.
fn cipher_list(suites: &[u16]) -> String {
    let names: Vec<&str> = suites
        .iter()
        .filter(|s| !is_grease(**s))
        .filter_map(|&suite| match suite {
            0x1301..=0x1303 => None,
            0xc02b => Some("ECDHE-ECDSA-AES128-GCM-SHA256"),
            0xc02f => Some("ECDHE-RSA-AES128-GCM-SHA256"),
            0xc02c => Some("ECDHE-ECDSA-AES256-GCM-SHA384"),
            0xc030 => Some("ECDHE-RSA-AES256-GCM-SHA384"),
            0xcca9 => Some("ECDHE-ECDSA-CHACHA20-POLY1305"),
            0xcca8 => Some("ECDHE-RSA-CHACHA20-POLY1305"),
            0xc009 => Some("ECDHE-ECDSA-AES128-SHA"),
            0xc00a => Some("ECDHE-ECDSA-AES256-SHA"),
            0xc013 => Some("ECDHE-RSA-AES128-SHA"),
            0xc014 => Some("ECDHE-RSA-AES256-SHA"),
            0x009c => Some("AES128-GCM-SHA256"),
            0x009d => Some("AES256-GCM-SHA384"),
            0x002f => Some("AES128-SHA"),
            0x0035 => Some("AES256-SHA"),
            0x000a => Some("DES-CBC3-SHA"),
            other => {
                debug!("Cipher suite {:#06x} has no BoringSSL counterpart", other);
                None
            }
        })
        .collect();
    names.join(":")
}

fn curves_list(groups: &[u16]) -> String {
    let names: Vec<&str> = groups
        .iter()
        .filter(|g| !is_grease(**g))
        .filter_map(|&group| match group {
            0x001d => Some("X25519"),
            0x0017 => Some("P-256"),
            0x0018 => Some("P-384"),
            0x0019 => Some("P-521"),
            other => {
                debug!("Group {:#06x} has no BoringSSL counterpart", other);
                None
            }
        })
        .collect();
    names.join(":")
}

fn sigalgs_list(schemes: &[u16]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for &scheme in schemes {
        let name = match scheme {
            0x0403 => "ECDSA+SHA256",
            0x0503 => "ECDSA+SHA384",
            0x0603 => "ECDSA+SHA512",
            0x0804 => "RSA-PSS+SHA256",
            0x0805 => "RSA-PSS+SHA384",
            0x0806 => "RSA-PSS+SHA512",
            0x0401 => "RSA+SHA256",
            0x0501 => "RSA+SHA384",
            0x0601 => "RSA+SHA512",
            0x0201 => "RSA+SHA1",
            0x0203 => "ECDSA+SHA1",
            0x0807 => "ed25519",
            other => {
                debug!("Signature scheme {:#06x} has no BoringSSL counterpart", other);
                continue;
            }
        };
        // BoringSSL rejects duplicate entries.
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.join(":")
}

fn alpn_wire(protocols: &[&str]) -> Vec<u8> {
    let mut wire = Vec::new();
    for proto in protocols {
        wire.push(proto.len() as u8);
        wire.extend_from_slice(proto.as_bytes());
    }
    wire
}
