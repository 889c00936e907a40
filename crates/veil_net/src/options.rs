use std::fmt;
use std::sync::Arc;

use crate::profile::Identity;
use crate::proxy::ProxySpec;
use crate::tls::TlsConfig;
use crate::transport::Dialer;

/// Everything a [`RoundTripper`](crate::RoundTripper) needs at construction.
///
/// Pure data: building one never touches the network.
#[derive(Clone, Default)]
pub struct ProfileOptions {
    pub proxy: ProxySpec,
    pub identity: Identity,
    pub tls: TlsConfig,
    /// Replaces the identity's default `User-Agent` for requests that carry none.
    pub user_agent: Option<String>,
    /// Innermost dial primitive; plain TCP when unset.
    pub base_dialer: Option<Arc<dyn Dialer>>,
}

impl ProfileOptions {
    pub fn builder() -> ProfileOptionsBuilder {
        ProfileOptionsBuilder::default()
    }

    /// The `User-Agent` injected into requests that lack one.
    pub fn effective_user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or_else(|| self.identity.user_agent())
    }
}

impl fmt::Debug for ProfileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileOptions")
            .field("proxy", &self.proxy)
            .field("identity", &self.identity)
            .field("tls", &self.tls)
            .field("user_agent", &self.user_agent)
            .field("base_dialer", &self.base_dialer.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct ProfileOptionsBuilder {
    options: ProfileOptions,
}

impl ProfileOptionsBuilder {
    pub fn proxy(mut self, proxy: impl Into<ProxySpec>) -> Self {
        self.options.proxy = proxy.into();
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.options.identity = identity;
        self
    }

    pub fn tls_config(mut self, tls: TlsConfig) -> Self {
        self.options.tls = tls;
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.options.tls.server_name = Some(name.into());
        self
    }

    pub fn insecure_skip_verify(mut self, insecure: bool) -> Self {
        self.options.tls.insecure_skip_verify = insecure;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = Some(user_agent.into());
        self
    }

    pub fn base_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.options.base_dialer = Some(dialer);
        self
    }

    pub fn build(self) -> ProfileOptions {
        self.options
    }
}
