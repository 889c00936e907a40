use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use veil_net::profile::{hello_extensions, is_grease, GREASE_PLACEHOLDER};
use veil_net::{
    Authority, BoringImpersonator, DirectDialer, HandshakeEngine, HelloParams, Identity, TlsConfig,
};

const EXT_APPLICATION_SETTINGS: u16 = 0x4469;
const EXT_COMPRESS_CERTIFICATE: u16 = 0x001b;

/// Starts a handshake against a listener that keeps the first record and hangs up.
async fn capture_hello(identity: Identity) -> Vec<u8> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut tcp, _) = listener.accept().await.unwrap();
        let mut record = vec![0u8; 5];
        tcp.read_exact(&mut record).await.unwrap();
        let len = u16::from_be_bytes([record[3], record[4]]) as usize;
        record.resize(5 + len, 0);
        tcp.read_exact(&mut record[5..]).await.unwrap();
        record
    });

    let tls = TlsConfig {
        insecure_skip_verify: true,
        ..Default::default()
    };
    let provider = BoringImpersonator::new(Arc::new(identity.profile()), &tls).unwrap();
    let engine = HandshakeEngine::new(Arc::new(provider), Some("localhost".to_string()));
    let result = engine
        .connect(&DirectDialer, &Authority::new("127.0.0.1", port))
        .await;
    assert!(result.is_err(), "listener never answers the hello");

    server.await.unwrap()
}

fn ids(record: &[u8]) -> Vec<u16> {
    hello_extensions(record)
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| !is_grease(*id))
        .collect()
}

#[tokio::test]
async fn wire_extension_order_is_stable() {
    let first = ids(&capture_hello(Identity::Chrome102).await);
    for _ in 0..3 {
        assert_eq!(ids(&capture_hello(Identity::Chrome102).await), first);
    }
}

#[tokio::test]
async fn wire_hello_follows_chrome_profile() {
    let profile = Identity::Chrome102.profile();
    let record = capture_hello(Identity::Chrome102).await;

    // ALPS has no BoringSSL setting; every other extension goes out in profile order.
    let expected: Vec<u16> = profile
        .extension_ids()
        .into_iter()
        .filter(|id| *id != GREASE_PLACEHOLDER && *id != EXT_APPLICATION_SETTINGS)
        .collect();
    assert_eq!(ids(&record), expected);

    let encoded: Vec<u16> = ids(&profile.encode(&HelloParams::new(Some("localhost"))))
        .into_iter()
        .filter(|id| *id != EXT_APPLICATION_SETTINGS)
        .collect();
    assert_eq!(ids(&record), encoded);

    let extensions = hello_extensions(&record).unwrap();
    let grease = extensions.iter().filter(|(id, _)| is_grease(*id)).count();
    assert_eq!(grease, 2);
    let compress = extensions
        .iter()
        .find(|(id, _)| *id == EXT_COMPRESS_CERTIFICATE)
        .map(|(_, body)| body.to_vec());
    assert_eq!(compress, Some(vec![2, 0x00, 0x02]));
}

#[tokio::test]
async fn firefox_hello_offers_no_cert_compression() {
    let record = capture_hello(Identity::Firefox105).await;
    let wire = ids(&record);
    assert!(!wire.contains(&EXT_COMPRESS_CERTIFICATE));
    assert_eq!(wire.first(), Some(&0x0000));
}
