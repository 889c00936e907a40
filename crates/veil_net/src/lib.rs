pub mod error;
pub mod options;
pub mod profile;
pub mod proxy;
pub mod round_tripper;
pub mod tls;
pub mod transport;

pub use error::{Error, ErrorKind, Result};
pub use options::{ProfileOptions, ProfileOptionsBuilder};
pub use profile::{ClientHelloProfile, Extension, HelloParams, Identity};
pub use proxy::{build_dialer, ProxyAuth, ProxyDescriptor, ProxyScheme, ProxySpec};
pub use round_tripper::{EngineKind, RoundTripper, TransportDefaults, TRANSPORT_DEFAULTS};
pub use tls::{
    BoringImpersonator, HandshakeEngine, TlsConfig, TlsConnection, TlsDialer, TlsImpersonator,
    TlsSession,
};
pub use transport::{Authority, BoxedStream, Dialer, DirectDialer};
