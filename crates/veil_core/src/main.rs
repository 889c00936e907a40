use anyhow::Context;
use clap::Parser;
use hyper::{Body, Method, Request};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use veil_core::config::Config;
use veil_core::Client;
use veil_net::{Identity, RoundTripper};

#[derive(Parser, Debug)]
#[command(name = "veil", version, about = "Fetch a URL with a browser TLS fingerprint")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upstream proxy (http://, https:// or socks5://)
    #[arg(long)]
    proxy: Option<String>,

    /// Client identity to impersonate (chrome102, firefox105, safari16)
    #[arg(long)]
    identity: Option<Identity>,

    /// Server name to send in SNI instead of the URL host
    #[arg(long)]
    server_name: Option<String>,

    /// Skip certificate verification
    #[arg(long)]
    insecure: bool,

    /// Send HEAD and print only the response head
    #[arg(long)]
    head: bool,

    /// Print the identity's JA3 string and exit
    #[arg(long)]
    ja3: bool,

    /// Log to stderr instead of the rolling log file
    #[arg(long)]
    log_stderr: bool,

    #[arg(required_unless_present = "ja3")]
    url: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(proxy) = &self.proxy {
            config.proxy = Some(proxy.clone());
        }
        if let Some(identity) = self.identity {
            config.identity = Some(identity.name().to_string());
        }
        if let Some(name) = &self.server_name {
            config.server_name = Some(name.clone());
        }
        if self.insecure {
            config.insecure = true;
        }
    }
}

fn init_logging(dir: &Path, to_stderr: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return None;
    }

    // stdout carries the response, so logs go to a file.
    let file_appender = tracing_appender::rolling::daily(dir, "veil.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(non_blocking)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);

    if cli.ja3 {
        println!("{}", config.identity()?.profile().ja3_text());
        return Ok(());
    }

    let _guard = init_logging(&config.log_dir, cli.log_stderr);
    tracing::info!("veil {} starting", env!("CARGO_PKG_VERSION"));

    let transport = RoundTripper::new(config.profile_options()?)
        .context("building transport")?;
    if let Some(proxy) = transport.proxy_url() {
        tracing::info!("Using proxy {}", proxy);
    }
    let client = Client::new(Some(Arc::new(transport)))?.with_timeout(config.timeout());

    let url = cli.url.as_deref().context("no URL given")?;
    let method = if cli.head { Method::HEAD } else { Method::GET };
    let req = Request::builder()
        .method(method)
        .uri(url)
        .body(Body::empty())
        .with_context(|| format!("invalid URL {url}"))?;

    let resp = client.execute(req).await?;
    tracing::info!("{} answered {}", url, resp.status());

    let mut out = std::io::stdout().lock();
    writeln!(out, "{:?} {}", resp.version(), resp.status())?;
    for (name, value) in resp.headers() {
        writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()))?;
    }
    if !cli.head {
        let body = hyper::body::to_bytes(resp.into_body()).await?;
        writeln!(out)?;
        out.write_all(&body)?;
    }
    out.flush()?;

    tracing::info!("Done.");
    Ok(())
}
