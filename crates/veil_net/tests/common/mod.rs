#![allow(dead_code)]

use boring::asn1::Asn1Time;
use boring::bn::{BigNum, MsbOption};
use boring::ec::{EcGroup, EcKey};
use boring::hash::MessageDigest;
use boring::nid::Nid;
use boring::pkey::{PKey, Private};
use boring::ssl::{select_next_proto, AlpnError, NameType, SslAcceptor, SslMethod};
use boring::x509::extension::SubjectAlternativeName;
use boring::x509::{X509NameBuilder, X509};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Request, Response};
use parking_lot::Mutex;
use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the test origin answers in ALPN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alpn {
    H2,
    Http11,
    /// No ALPN extension in the server hello.
    Silent,
    /// `http/1.1` on the first connection, `h2` afterwards.
    Http11ThenH2,
}

pub struct TlsOrigin {
    pub addr: SocketAddr,
    pub cert_pem: Vec<u8>,
    accepted: Arc<AtomicUsize>,
    server_names: Arc<Mutex<Vec<Option<String>>>>,
}

impl TlsOrigin {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self, host: &str, path: &str) -> String {
        format!("https://{}:{}{}", host, self.port(), path)
    }

    /// TCP connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// SNI of every completed handshake, in order.
    pub fn server_names(&self) -> Vec<Option<String>> {
        self.server_names.lock().clone()
    }
}

pub fn self_signed() -> (X509, PKey<Private>) {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "localhost").unwrap();
    let name = name.build();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .ip("127.0.0.1")
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(san).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    (builder.build(), key)
}

/// HTTPS origin on 127.0.0.1 whose responses echo the request's `User-Agent`.
///
/// Requests to `/slow` are answered after a short delay.
pub async fn spawn_tls_origin(alpn: Alpn) -> TlsOrigin {
    let (cert, key) = self_signed();
    let cert_pem = cert.to_pem().unwrap();

    let handshakes = Arc::new(AtomicUsize::new(0));
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    acceptor.set_private_key(&key).unwrap();
    acceptor.set_certificate(&cert).unwrap();
    let counter = handshakes.clone();
    acceptor.set_alpn_select_callback(move |_, client| {
        let nth = counter.fetch_add(1, Ordering::SeqCst);
        let offer: &[u8] = match (alpn, nth) {
            (Alpn::H2, _) => b"\x02h2",
            (Alpn::Http11, _) | (Alpn::Http11ThenH2, 0) => b"\x08http/1.1",
            (Alpn::Http11ThenH2, _) => b"\x02h2",
            (Alpn::Silent, _) => return Err(AlpnError::NOACK),
        };
        select_next_proto(offer, client).ok_or(AlpnError::NOACK)
    });
    let acceptor = Arc::new(acceptor.build());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let server_names = Arc::new(Mutex::new(Vec::new()));

    let origin = TlsOrigin {
        addr,
        cert_pem,
        accepted: accepted.clone(),
        server_names: server_names.clone(),
    };

    tokio::spawn(async move {
        loop {
            let (tcp, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            accepted.fetch_add(1, Ordering::SeqCst);
            let acceptor = acceptor.clone();
            let server_names = server_names.clone();
            tokio::spawn(async move {
                let tls = match tokio_boring::accept(&acceptor, tcp).await {
                    Ok(tls) => tls,
                    Err(_) => return,
                };
                let sni = tls
                    .ssl()
                    .servername(NameType::HOST_NAME)
                    .map(str::to_string);
                server_names.lock().push(sni);
                let h2 = tls.ssl().selected_alpn_protocol() == Some(b"h2".as_slice());
                let _ = Http::new()
                    .http2_only(h2)
                    .serve_connection(tls, service_fn(echo_user_agent))
                    .await;
            });
        }
    });

    origin
}

/// Plain HTTP origin with the same echo behavior.
pub async fn spawn_plain_origin() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let _ = Http::new()
                    .serve_connection(tcp, service_fn(echo_user_agent))
                    .await;
            });
        }
    });
    (addr, accepted)
}

async fn echo_user_agent(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.uri().path() == "/slow" {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    let agent = req
        .headers()
        .get(hyper::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("<none>")
        .to_string();
    Ok(Response::builder()
        .header("x-http-version", format!("{:?}", req.version()))
        .body(Body::from(agent))
        .unwrap())
}

/// Proxy that accepts every connection and closes it straight away.
pub async fn spawn_closing_proxy() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(tcp);
        }
    });
    (addr, accepted)
}

/// Minimal HTTP CONNECT proxy. Answers `status` to every CONNECT and, on 200, splices to the target.
pub async fn spawn_connect_proxy(status: &'static str) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    tokio::spawn(async move {
        while let Ok((client, _)) = listener.accept().await {
            tokio::spawn(serve_connect(client, status, seen.clone()));
        }
    });
    (addr, requests)
}

pub struct TlsConnectProxy {
    pub addr: SocketAddr,
    server_names: Arc<Mutex<Vec<Option<String>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TlsConnectProxy {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// SNI of every proxy-facing handshake.
    pub fn server_names(&self) -> Vec<Option<String>> {
        self.server_names.lock().clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

/// CONNECT proxy behind TLS, answering 200 to every tunnel request.
pub async fn spawn_tls_connect_proxy() -> TlsConnectProxy {
    let (cert, key) = self_signed();
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    acceptor.set_private_key(&key).unwrap();
    acceptor.set_certificate(&cert).unwrap();
    let acceptor = Arc::new(acceptor.build());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy = TlsConnectProxy {
        addr: listener.local_addr().unwrap(),
        server_names: Arc::new(Mutex::new(Vec::new())),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let server_names = proxy.server_names.clone();
    let seen = proxy.requests.clone();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let server_names = server_names.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let tls = match tokio_boring::accept(&acceptor, tcp).await {
                    Ok(tls) => tls,
                    Err(_) => return,
                };
                let sni = tls
                    .ssl()
                    .servername(NameType::HOST_NAME)
                    .map(str::to_string);
                server_names.lock().push(sni);
                serve_connect(tls, "200 Connection established", seen).await;
            });
        }
    });
    proxy
}

async fn serve_connect<S>(mut client: S, status: &'static str, seen: Arc<Mutex<Vec<String>>>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let head = read_head(&mut client).await;
    let target = head
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    seen.lock().push(head);
    let reply = format!("HTTP/1.1 {}\r\n\r\n", status);
    if client.write_all(reply.as_bytes()).await.is_err() {
        return;
    }
    if !status.starts_with("200") {
        let mut rest = Vec::new();
        let _ = client.read_to_end(&mut rest).await;
        return;
    }
    if let Ok(mut upstream) = TcpStream::connect(target).await {
        let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
    }
}

async fn read_head<S: AsyncRead + Unpin>(conn: &mut S) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        match conn.read(&mut byte).await {
            Ok(1) => buf.push(byte[0]),
            _ => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// SOCKS5 server without authentication. Records every CONNECT target as `host:port`.
pub async fn spawn_socks5_proxy() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let targets = Arc::new(Mutex::new(Vec::new()));
    let seen = targets.clone();
    tokio::spawn(async move {
        while let Ok((client, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let _ = serve_socks5(client, seen).await;
            });
        }
    });
    (addr, targets)
}

async fn serve_socks5(mut client: TcpStream, seen: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let mut greeting = [0u8; 2];
    client.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    client.read_exact(&mut methods).await?;
    client.write_all(&[5, 0]).await?;

    let mut head = [0u8; 4];
    client.read_exact(&mut head).await?;
    let host = match head[3] {
        1 => {
            let mut ip = [0u8; 4];
            client.read_exact(&mut ip).await?;
            Ipv4Addr::from(ip).to_string()
        }
        3 => {
            let mut len = [0u8; 1];
            client.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            client.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).into_owned()
        }
        _ => return Ok(()),
    };
    let mut port = [0u8; 2];
    client.read_exact(&mut port).await?;
    let target = format!("{}:{}", host, u16::from_be_bytes(port));
    seen.lock().push(target.clone());

    let mut upstream = match TcpStream::connect(&target).await {
        Ok(upstream) => upstream,
        Err(_) => return client.write_all(&[5, 5, 0, 1, 0, 0, 0, 0, 0, 0]).await,
    };
    client.write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    Ok(())
}
