use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use veil_net::{Identity, ProfileOptions, ProxySpec, TlsConfig};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Proxy URL (`http://`, `https://` or `socks5://`).
    pub proxy: Option<String>,
    pub identity: Option<String>,
    pub server_name: Option<String>,
    pub insecure: bool,
    /// PEM file with extra trust anchors.
    pub root_ca_file: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy: None,
            identity: None,
            server_name: None,
            insecure: false,
            root_ca_file: None,
            user_agent: None,
            timeout_secs: 30,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn identity(&self) -> Result<Identity> {
        match &self.identity {
            Some(name) => name.parse().map_err(anyhow::Error::msg),
            None => Ok(Identity::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn profile_options(&self) -> Result<ProfileOptions> {
        let root_certificates = match &self.root_ca_file {
            Some(path) => Some(
                std::fs::read(path)
                    .with_context(|| format!("reading root CA bundle {}", path.display()))?,
            ),
            None => None,
        };

        Ok(ProfileOptions {
            proxy: self
                .proxy
                .clone()
                .map(ProxySpec::Text)
                .unwrap_or_default(),
            identity: self.identity()?,
            tls: TlsConfig {
                server_name: self.server_name.clone(),
                insecure_skip_verify: self.insecure,
                root_certificates,
            },
            user_agent: self.user_agent.clone(),
            base_dialer: None,
        })
    }
}
