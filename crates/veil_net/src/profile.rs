//! Client Hello fingerprint profiles.
//!
//! A profile is pure data: the ordered cipher list and the ordered extension
//! list with their parameters. Passive fingerprinting hashes that sequence, so
//! nothing here is computed at runtime except per-connection values (client
//! random, GREASE values derived from it, server name, padding length).

use rand::RngCore;
use std::fmt;
use std::str::FromStr;

/// Stand-in for a GREASE value inside cipher, group and version lists.
pub const GREASE_PLACEHOLDER: u16 = 0x0a0a;

pub const VERSION_TLS10: u16 = 0x0301;
pub const VERSION_TLS11: u16 = 0x0302;
pub const VERSION_TLS12: u16 = 0x0303;
pub const VERSION_TLS13: u16 = 0x0304;

pub const GROUP_X25519: u16 = 0x001d;
pub const GROUP_P256: u16 = 0x0017;
pub const GROUP_P384: u16 = 0x0018;
pub const GROUP_P521: u16 = 0x0019;
pub const GROUP_FFDHE2048: u16 = 0x0100;
pub const GROUP_FFDHE3072: u16 = 0x0101;

pub const CERT_COMPRESSION_ZLIB: u16 = 0x0001;
pub const CERT_COMPRESSION_BROTLI: u16 = 0x0002;

const PSK_MODE_DHE: u8 = 1;
const POINT_FORMAT_UNCOMPRESSED: u8 = 0;

/// Named client identities with a fixed fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Identity {
    #[default]
    Chrome102,
    Firefox105,
    Safari16,
}

impl Identity {
    pub const ALL: [Identity; 3] = [Identity::Chrome102, Identity::Firefox105, Identity::Safari16];

    pub fn name(&self) -> &'static str {
        match self {
            Identity::Chrome102 => "chrome102",
            Identity::Firefox105 => "firefox105",
            Identity::Safari16 => "safari16",
        }
    }

    /// The `User-Agent` a real client with this fingerprint sends.
    pub fn user_agent(&self) -> &'static str {
        match self {
            Identity::Chrome102 => {
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.0.0 Safari/537.36"
            }
            Identity::Firefox105 => {
                "Mozilla/5.0 (X11; Linux x86_64; rv:105.0) Gecko/20100101 Firefox/105.0"
            }
            Identity::Safari16 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Safari/605.1.15"
            }
        }
    }

    pub fn profile(&self) -> ClientHelloProfile {
        ClientHelloProfile::for_identity(*self)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Identity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chrome102" | "chrome_102" => Ok(Identity::Chrome102),
            "firefox" | "firefox105" | "firefox_105" => Ok(Identity::Firefox105),
            "safari" | "safari16" | "safari_16" => Ok(Identity::Safari16),
            other => Err(format!("unknown client identity {:?}", other)),
        }
    }
}

/// One Client Hello extension and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    /// RFC 8701 reserved extension. The first occurrence is empty, the second carries one zero byte.
    Grease,
    /// Filled from the per-connection server name; omitted when there is none.
    ServerName,
    ExtendedMasterSecret,
    RenegotiationInfo,
    SupportedGroups(Vec<u16>),
    EcPointFormats(Vec<u8>),
    SessionTicket,
    Alpn(Vec<&'static str>),
    StatusRequest,
    SignatureAlgorithms(Vec<u16>),
    SignedCertificateTimestamp,
    /// Groups for which a key share is offered.
    KeyShare(Vec<u16>),
    PskKeyExchangeModes(Vec<u8>),
    SupportedVersions(Vec<u16>),
    CompressCertificate(Vec<u16>),
    ApplicationSettings(Vec<&'static str>),
    DelegatedCredentials(Vec<u16>),
    RecordSizeLimit(u16),
    /// BoringSSL padding style: pads hellos in (0xff, 0x200) up to 0x200.
    Padding,
}

impl Extension {
    /// Wire identifier; GREASE reports the placeholder.
    pub fn id(&self) -> u16 {
        match self {
            Extension::Grease => GREASE_PLACEHOLDER,
            Extension::ServerName => 0x0000,
            Extension::StatusRequest => 0x0005,
            Extension::SupportedGroups(_) => 0x000a,
            Extension::EcPointFormats(_) => 0x000b,
            Extension::SignatureAlgorithms(_) => 0x000d,
            Extension::Alpn(_) => 0x0010,
            Extension::SignedCertificateTimestamp => 0x0012,
            Extension::Padding => 0x0015,
            Extension::ExtendedMasterSecret => 0x0017,
            Extension::CompressCertificate(_) => 0x001b,
            Extension::RecordSizeLimit(_) => 0x001c,
            Extension::DelegatedCredentials(_) => 0x0022,
            Extension::SessionTicket => 0x0023,
            Extension::SupportedVersions(_) => 0x002b,
            Extension::PskKeyExchangeModes(_) => 0x002d,
            Extension::KeyShare(_) => 0x0033,
            Extension::ApplicationSettings(_) => 0x4469,
            Extension::RenegotiationInfo => 0xff01,
        }
    }

    /// Appends `id || length || body`. Returns `false` when the extension is skipped.
    fn encode(&self, ctx: &mut EncodeContext<'_>, out: &mut Vec<u8>) -> bool {
        let mut body = Vec::new();
        let id = match self {
            Extension::Grease => {
                let value = ctx.grease.next_extension();
                if ctx.grease_extensions_seen > 0 {
                    body.push(0);
                }
                ctx.grease_extensions_seen += 1;
                value
            }
            Extension::ServerName => {
                let Some(name) = ctx.params.server_name.as_deref() else {
                    return false;
                };
                let mut entry = vec![0u8];
                put_u16_prefixed(&mut entry, name.as_bytes());
                put_u16_prefixed(&mut body, &entry);
                self.id()
            }
            Extension::ExtendedMasterSecret
            | Extension::SessionTicket
            | Extension::SignedCertificateTimestamp => self.id(),
            Extension::RenegotiationInfo => {
                body.push(0);
                self.id()
            }
            Extension::StatusRequest => {
                // OCSP, empty responder list, empty request extensions.
                body.extend_from_slice(&[1, 0, 0, 0, 0]);
                self.id()
            }
            Extension::SupportedGroups(groups) => {
                let groups: Vec<u16> = groups.iter().map(|g| ctx.grease.resolve_group(*g)).collect();
                put_u16_prefixed(&mut body, &u16_bytes(&groups));
                self.id()
            }
            Extension::EcPointFormats(formats) => {
                put_u8_prefixed(&mut body, formats);
                self.id()
            }
            Extension::Alpn(protocols) | Extension::ApplicationSettings(protocols) => {
                let mut list = Vec::new();
                for proto in protocols {
                    put_u8_prefixed(&mut list, proto.as_bytes());
                }
                put_u16_prefixed(&mut body, &list);
                self.id()
            }
            Extension::SignatureAlgorithms(schemes) | Extension::DelegatedCredentials(schemes) => {
                put_u16_prefixed(&mut body, &u16_bytes(schemes));
                self.id()
            }
            Extension::KeyShare(groups) => {
                let mut shares = Vec::new();
                for group in groups {
                    let group = ctx.grease.resolve_group(*group);
                    shares.extend_from_slice(&group.to_be_bytes());
                    put_u16_prefixed(&mut shares, &ctx.params.key_share_placeholder(group));
                }
                put_u16_prefixed(&mut body, &shares);
                self.id()
            }
            Extension::PskKeyExchangeModes(modes) => {
                put_u8_prefixed(&mut body, modes);
                self.id()
            }
            Extension::SupportedVersions(versions) => {
                let versions: Vec<u16> =
                    versions.iter().map(|v| ctx.grease.resolve_version(*v)).collect();
                put_u8_prefixed(&mut body, &u16_bytes(&versions));
                self.id()
            }
            Extension::CompressCertificate(algorithms) => {
                put_u8_prefixed(&mut body, &u16_bytes(algorithms));
                self.id()
            }
            Extension::RecordSizeLimit(limit) => {
                body.extend_from_slice(&limit.to_be_bytes());
                self.id()
            }
            Extension::Padding => {
                let Some(len) = boring_padding_len(ctx.unpadded_len) else {
                    return false;
                };
                body.resize(len, 0);
                self.id()
            }
        };
        out.extend_from_slice(&id.to_be_bytes());
        put_u16_prefixed(out, &body);
        true
    }
}

/// Per-connection inputs to the encoder.
#[derive(Debug, Clone)]
pub struct HelloParams {
    pub server_name: Option<String>,
    pub random: [u8; 32],
    pub session_id: [u8; 32],
}

impl HelloParams {
    /// Fresh random and session id.
    pub fn new(server_name: Option<&str>) -> Self {
        let mut rng = rand::thread_rng();
        let mut random = [0u8; 32];
        let mut session_id = [0u8; 32];
        rng.fill_bytes(&mut random);
        rng.fill_bytes(&mut session_id);
        Self {
            server_name: server_name.map(str::to_string),
            random,
            session_id,
        }
    }

    // The encoder only produces the wire image; no private key backs these bytes.
    fn key_share_placeholder(&self, group: u16) -> Vec<u8> {
        let len = match group {
            GROUP_X25519 => 32,
            GROUP_P256 => 65,
            GROUP_P384 => 97,
            GROUP_P521 => 133,
            g if is_grease(g) => return vec![0],
            _ => 32,
        };
        let mut data: Vec<u8> = self.random.iter().rev().copied().cycle().take(len).collect();
        if matches!(group, GROUP_P256 | GROUP_P384 | GROUP_P521) {
            data[0] = 0x04;
        }
        data
    }
}

/// GREASE values derived from the client random the way BoringSSL derives them from its seed.
#[derive(Debug, Clone, Copy)]
struct Grease {
    seed: [u8; 5],
    extensions_issued: u8,
}

impl Grease {
    const CIPHER: usize = 0;
    const GROUP: usize = 1;
    const EXTENSION1: usize = 2;
    const EXTENSION2: usize = 3;
    const VERSION: usize = 4;

    fn from_random(random: &[u8; 32]) -> Self {
        let mut seed = [0u8; 5];
        seed.copy_from_slice(&random[..5]);
        Self {
            seed,
            extensions_issued: 0,
        }
    }

    fn value(&self, index: usize) -> u16 {
        let byte = (self.seed[index] & 0xf0) | 0x0a;
        u16::from_be_bytes([byte, byte])
    }

    fn resolve(&self, value: u16, index: usize) -> u16 {
        if value == GREASE_PLACEHOLDER {
            self.value(index)
        } else {
            value
        }
    }

    fn resolve_cipher(&self, value: u16) -> u16 {
        self.resolve(value, Self::CIPHER)
    }

    fn resolve_group(&self, value: u16) -> u16 {
        self.resolve(value, Self::GROUP)
    }

    fn resolve_version(&self, value: u16) -> u16 {
        self.resolve(value, Self::VERSION)
    }

    fn next_extension(&mut self) -> u16 {
        let first = self.value(Self::EXTENSION1);
        let value = if self.extensions_issued == 0 {
            first
        } else {
            let second = self.value(Self::EXTENSION2);
            if second == first {
                second ^ 0x1010
            } else {
                second
            }
        };
        self.extensions_issued = self.extensions_issued.saturating_add(1);
        value
    }
}

struct EncodeContext<'a> {
    params: &'a HelloParams,
    grease: Grease,
    grease_extensions_seen: usize,
    unpadded_len: usize,
}

/// Static description of a Client Hello for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHelloProfile {
    identity: Identity,
    min_version: u16,
    max_version: u16,
    cipher_suites: Vec<u16>,
    compression_methods: Vec<u8>,
    extensions: Vec<Extension>,
}

impl ClientHelloProfile {
    pub fn for_identity(identity: Identity) -> Self {
        match identity {
            Identity::Chrome102 => chrome_102(),
            Identity::Firefox105 => firefox_105(),
            Identity::Safari16 => safari_16(),
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn min_version(&self) -> u16 {
        self.min_version
    }

    pub fn max_version(&self) -> u16 {
        self.max_version
    }

    pub fn cipher_suites(&self) -> &[u16] {
        &self.cipher_suites
    }

    pub fn compression_methods(&self) -> &[u8] {
        &self.compression_methods
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Extension identifiers in wire order, GREASE shown as the placeholder.
    pub fn extension_ids(&self) -> Vec<u16> {
        self.extensions.iter().map(Extension::id).collect()
    }

    pub fn uses_grease(&self) -> bool {
        self.cipher_suites.contains(&GREASE_PLACEHOLDER)
            || self.extensions.contains(&Extension::Grease)
    }

    pub fn alpn_protocols(&self) -> &[&'static str] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Alpn(protocols) => Some(protocols.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn supported_groups(&self) -> &[u16] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::SupportedGroups(groups) => Some(groups.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn signature_algorithms(&self) -> &[u16] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::SignatureAlgorithms(schemes) => Some(schemes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Certificate compression algorithms offered, in preference order.
    pub fn cert_compression_algorithms(&self) -> &[u16] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::CompressCertificate(algorithms) => Some(algorithms.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn has_extension(&self, id: u16) -> bool {
        self.extensions.iter().any(|ext| ext.id() == id)
    }

    /// Encodes the TLS record carrying this Client Hello.
    pub fn encode(&self, params: &HelloParams) -> Vec<u8> {
        let grease = Grease::from_random(&params.random);
        let legacy_version = self.max_version.min(VERSION_TLS12);

        let mut head = Vec::with_capacity(512);
        head.extend_from_slice(&legacy_version.to_be_bytes());
        head.extend_from_slice(&params.random);
        put_u8_prefixed(&mut head, &params.session_id);
        let ciphers: Vec<u16> = self
            .cipher_suites
            .iter()
            .map(|c| grease.resolve_cipher(*c))
            .collect();
        put_u16_prefixed(&mut head, &u16_bytes(&ciphers));
        put_u8_prefixed(&mut head, &self.compression_methods);

        let mut ctx = EncodeContext {
            params,
            grease,
            grease_extensions_seen: 0,
            unpadded_len: 0,
        };
        let mut extensions = Vec::new();
        for ext in self.extensions.iter().filter(|e| **e != Extension::Padding) {
            ext.encode(&mut ctx, &mut extensions);
        }
        if self.extensions.contains(&Extension::Padding) {
            // Handshake header + fixed fields + extensions length + extensions.
            ctx.unpadded_len = 4 + head.len() + 2 + extensions.len();
            Extension::Padding.encode(&mut ctx, &mut extensions);
        }

        let mut body = head;
        put_u16_prefixed(&mut body, &extensions);

        let mut handshake = Vec::with_capacity(body.len() + 4);
        handshake.push(0x01);
        handshake.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        handshake.extend_from_slice(&body);

        let mut record = Vec::with_capacity(handshake.len() + 5);
        record.push(0x16);
        record.extend_from_slice(&VERSION_TLS10.to_be_bytes());
        put_u16_prefixed(&mut record, &handshake);
        record
    }

    /// JA3 text as seen for a hello sent to a named host, GREASE removed.
    pub fn ja3_text(&self) -> String {
        let join = |values: &mut dyn Iterator<Item = u16>| {
            values.map(|v| v.to_string()).collect::<Vec<_>>().join("-")
        };
        let version = self.max_version.min(VERSION_TLS12);
        let ciphers = join(&mut self.cipher_suites.iter().copied().filter(|c| !is_grease(*c)));
        let extensions = join(
            &mut self
                .extensions
                .iter()
                .filter(|e| **e != Extension::Grease)
                .map(Extension::id),
        );
        let groups = join(&mut self.supported_groups().iter().copied().filter(|g| !is_grease(*g)));
        let formats = self
            .extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::EcPointFormats(f) => Some(f.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("-")),
                _ => None,
            })
            .unwrap_or_default();
        format!("{},{},{},{},{}", version, ciphers, extensions, groups, formats)
    }
}

impl Default for ClientHelloProfile {
    fn default() -> Self {
        Self::for_identity(Identity::default())
    }
}

pub fn is_grease(value: u16) -> bool {
    value & 0x0f0f == 0x0a0a && value >> 8 == value & 0xff
}

fn boring_padding_len(unpadded_len: usize) -> Option<usize> {
    if unpadded_len > 0xff && unpadded_len < 0x200 {
        let len = 0x200 - unpadded_len;
        Some(if len >= 4 + 1 { len - 4 } else { 1 })
    } else {
        None
    }
}

fn u16_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn put_u8_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.push(data.len() as u8);
    out.extend_from_slice(data);
}

fn put_u16_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
}

/// Splits a Client Hello record into `(id, body)` extension pairs, in wire order.
///
/// Returns `None` unless `record` is exactly one well-formed Client Hello record.
pub fn hello_extensions(record: &[u8]) -> Option<Vec<(u16, &[u8])>> {
    let mut rec = Reader(record);
    if rec.u8()? != 0x16 {
        return None;
    }
    rec.take(2)?;
    let mut hs = Reader(rec.u16_prefixed()?);
    if hs.u8()? != 0x01 || !rec.0.is_empty() {
        return None;
    }
    let len = hs.take(3)?;
    let len = u32::from_be_bytes([0, len[0], len[1], len[2]]) as usize;
    let mut body = Reader(hs.take(len)?);
    body.take(2 + 32)?;
    body.u8_prefixed()?;
    body.u16_prefixed()?;
    body.u8_prefixed()?;
    let mut exts = Reader(body.u16_prefixed()?);
    if !body.0.is_empty() {
        return None;
    }

    let mut out = Vec::new();
    while !exts.0.is_empty() {
        let id = exts.u16()?;
        out.push((id, exts.u16_prefixed()?));
    }
    Some(out)
}

struct Reader<'a>(&'a [u8]);

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.0.len() < n {
            return None;
        }
        let (head, rest) = self.0.split_at(n);
        self.0 = rest;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn u8_prefixed(&mut self) -> Option<&'a [u8]> {
        let len = self.u8()? as usize;
        self.take(len)
    }

    fn u16_prefixed(&mut self) -> Option<&'a [u8]> {
        let len = self.u16()? as usize;
        self.take(len)
    }
}

fn chrome_102() -> ClientHelloProfile {
    ClientHelloProfile {
        identity: Identity::Chrome102,
        min_version: VERSION_TLS12,
        max_version: VERSION_TLS13,
        cipher_suites: vec![
            GREASE_PLACEHOLDER,
            0x1301, 0x1302, 0x1303,
            0xc02b, 0xc02f, 0xc02c, 0xc030,
            0xcca9, 0xcca8,
            0xc013, 0xc014,
            0x009c, 0x009d, 0x002f, 0x0035,
        ],
        compression_methods: vec![0],
        extensions: vec![
            Extension::Grease,
            Extension::ServerName,
            Extension::ExtendedMasterSecret,
            Extension::RenegotiationInfo,
            Extension::SupportedGroups(vec![GREASE_PLACEHOLDER, GROUP_X25519, GROUP_P256, GROUP_P384]),
            Extension::EcPointFormats(vec![POINT_FORMAT_UNCOMPRESSED]),
            Extension::SessionTicket,
            Extension::Alpn(vec!["h2", "http/1.1"]),
            Extension::StatusRequest,
            Extension::SignatureAlgorithms(vec![
                0x0403, 0x0804, 0x0401, 0x0503, 0x0805, 0x0501, 0x0806, 0x0601,
            ]),
            Extension::SignedCertificateTimestamp,
            Extension::KeyShare(vec![GREASE_PLACEHOLDER, GROUP_X25519]),
            Extension::PskKeyExchangeModes(vec![PSK_MODE_DHE]),
            Extension::SupportedVersions(vec![GREASE_PLACEHOLDER, VERSION_TLS13, VERSION_TLS12]),
            Extension::CompressCertificate(vec![CERT_COMPRESSION_BROTLI]),
            Extension::ApplicationSettings(vec!["h2"]),
            Extension::Grease,
            Extension::Padding,
        ],
    }
}

fn firefox_105() -> ClientHelloProfile {
    ClientHelloProfile {
        identity: Identity::Firefox105,
        min_version: VERSION_TLS12,
        max_version: VERSION_TLS13,
        cipher_suites: vec![
            0x1301, 0x1303, 0x1302,
            0xc02b, 0xc02f, 0xcca9, 0xcca8, 0xc02c, 0xc030,
            0xc00a, 0xc009, 0xc013, 0xc014,
            0x009c, 0x009d, 0x002f, 0x0035,
        ],
        compression_methods: vec![0],
        extensions: vec![
            Extension::ServerName,
            Extension::ExtendedMasterSecret,
            Extension::RenegotiationInfo,
            Extension::SupportedGroups(vec![
                GROUP_X25519, GROUP_P256, GROUP_P384, GROUP_P521, GROUP_FFDHE2048, GROUP_FFDHE3072,
            ]),
            Extension::EcPointFormats(vec![POINT_FORMAT_UNCOMPRESSED]),
            Extension::SessionTicket,
            Extension::Alpn(vec!["h2", "http/1.1"]),
            Extension::StatusRequest,
            Extension::DelegatedCredentials(vec![0x0403, 0x0503, 0x0603, 0x0203]),
            Extension::KeyShare(vec![GROUP_X25519, GROUP_P256]),
            Extension::SupportedVersions(vec![VERSION_TLS13, VERSION_TLS12]),
            Extension::SignatureAlgorithms(vec![
                0x0403, 0x0503, 0x0603, 0x0804, 0x0805, 0x0806, 0x0401, 0x0501, 0x0601, 0x0203,
                0x0201,
            ]),
            Extension::PskKeyExchangeModes(vec![PSK_MODE_DHE]),
            Extension::RecordSizeLimit(0x4001),
            Extension::Padding,
        ],
    }
}

fn safari_16() -> ClientHelloProfile {
    ClientHelloProfile {
        identity: Identity::Safari16,
        min_version: VERSION_TLS10,
        max_version: VERSION_TLS13,
        cipher_suites: vec![
            GREASE_PLACEHOLDER,
            0x1301, 0x1302, 0x1303,
            0xc02c, 0xc02b, 0xcca9, 0xc030, 0xc02f, 0xcca8,
            0xc00a, 0xc009, 0xc014, 0xc013,
            0x009d, 0x009c, 0x0035, 0x002f,
            0xc008, 0xc012, 0x000a,
        ],
        compression_methods: vec![0],
        extensions: vec![
            Extension::Grease,
            Extension::ServerName,
            Extension::ExtendedMasterSecret,
            Extension::RenegotiationInfo,
            Extension::SupportedGroups(vec![
                GREASE_PLACEHOLDER, GROUP_X25519, GROUP_P256, GROUP_P384, GROUP_P521,
            ]),
            Extension::EcPointFormats(vec![POINT_FORMAT_UNCOMPRESSED]),
            Extension::Alpn(vec!["h2", "http/1.1"]),
            Extension::StatusRequest,
            Extension::SignatureAlgorithms(vec![
                0x0403, 0x0804, 0x0401, 0x0503, 0x0203, 0x0805, 0x0805, 0x0501, 0x0806, 0x0601,
                0x0201,
            ]),
            Extension::SignedCertificateTimestamp,
            Extension::KeyShare(vec![GREASE_PLACEHOLDER, GROUP_X25519]),
            Extension::PskKeyExchangeModes(vec![PSK_MODE_DHE]),
            Extension::SupportedVersions(vec![
                GREASE_PLACEHOLDER, VERSION_TLS13, VERSION_TLS12, VERSION_TLS11, VERSION_TLS10,
            ]),
            Extension::CompressCertificate(vec![CERT_COMPRESSION_ZLIB]),
            Extension::Grease,
            Extension::Padding,
        ],
    }
}
