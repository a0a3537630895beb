//! Servers bound from URIs, driven by real clients.

use std::time::Duration;

use sockline_client::config::{
    ConnectorConfig, DnsSetting, PemSource, SchemeSetting, ServerConfig, TlsContextOptions,
};
use sockline_client::connect::Connector;
use sockline_client::server::{Server, ServerEvent, SocketServer};
use sockline_client::tls::generate_self_signed;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

fn tls_config() -> ServerConfig {
    let generated = generate_self_signed(&["localhost"]).unwrap();
    ServerConfig::default().with_tls(
        TlsContextOptions::default()
            .with_local_cert(PemSource::Inline(generated.cert_pem))
            .with_local_pk(PemSource::Inline(generated.key_pem)),
    )
}

fn port_of(address: &str) -> u16 {
    address.rsplit(':').next().unwrap().parse().unwrap()
}

fn insecure_connector() -> Connector {
    Connector::with_config(
        ConnectorConfig::default()
            .with_dns(DnsSetting::Disabled)
            .with_tls(SchemeSetting::Enabled(TlsContextOptions::insecure())),
    )
    .unwrap()
}

#[tokio::test]
async fn tcp_server_echoes_through_connector() {
    let mut server = SocketServer::bind("tcp://127.0.0.1:0", &ServerConfig::default()).unwrap();
    let address = server.address().unwrap();
    assert!(address.starts_with("tcp://127.0.0.1:"));
    assert!(server.supports_socket_options());

    let connector = Connector::new().unwrap();
    let client = tokio::spawn(async move {
        let mut connection = connector.connect(&address).await.unwrap();
        connection.write_all(b"tcp").await.unwrap();
        let mut buf = [0u8; 3];
        connection.read_exact(&mut buf).await.unwrap();
        buf
    });

    let Some(ServerEvent::Connection(mut connection)) = server.next_event().await else {
        panic!("no connection");
    };
    assert!(!connection.is_encrypted());
    let mut buf = [0u8; 3];
    connection.read_exact(&mut buf).await.unwrap();
    connection.write_all(&buf).await.unwrap();

    assert_eq!(&client.await.unwrap(), b"tcp");
    server.close();
    assert!(server.address().is_none());
}

#[tokio::test]
async fn tls_server_accepts_encrypted_clients() {
    let mut server = SocketServer::bind("tls://127.0.0.1:0", &tls_config()).unwrap();
    let address = server.address().unwrap();
    assert!(address.starts_with("tls://127.0.0.1:"));

    let connector = insecure_connector();
    let client = tokio::spawn(async move { connector.connect(&address).await.unwrap() });

    let Some(ServerEvent::Connection(connection)) = server.next_event().await else {
        panic!("no connection");
    };
    assert!(connection.is_encrypted());
    assert!(client.await.unwrap().is_encrypted());
}

#[tokio::test]
async fn stalled_handshake_does_not_block_other_clients() {
    let mut server = SocketServer::bind("tls://127.0.0.1:0", &tls_config()).unwrap();
    let address = server.address().unwrap();
    let port = port_of(&address);

    // Connects but never sends a ClientHello.
    let _stalled = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

    let connector = insecure_connector();
    let client = tokio::spawn(async move { connector.connect(&address).await.unwrap() });

    let event = timeout(Duration::from_secs(5), server.next_event()).await.unwrap();
    assert!(matches!(event, Some(ServerEvent::Connection(_))));
    client.await.unwrap();
}

#[tokio::test]
async fn tls_server_requires_certificate() {
    let err = SocketServer::bind("tls://127.0.0.1:0", &ServerConfig::default()).unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn bare_port_and_unknown_scheme_are_rejected() {
    let config = ServerConfig::default();
    assert!(SocketServer::bind("8080", &config).unwrap_err().is_invalid_uri());
    assert!(SocketServer::bind("udp://127.0.0.1:0", &config).unwrap_err().is_invalid_uri());
}

#[tokio::test]
async fn occupied_port_fails_to_listen() {
    let first = SocketServer::bind("tcp://127.0.0.1:0", &ServerConfig::default()).unwrap();
    let address = first.address().unwrap();

    let err = SocketServer::bind(&address, &ServerConfig::default()).unwrap_err();
    assert!(err.to_string().starts_with(&format!("Failed to listen on \"{address}\"")));
}

#[cfg(unix)]
#[tokio::test]
async fn unix_server_accepts_unix_clients() {
    let path = std::env::temp_dir().join(format!("sockline-{}-socket-server.sock", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let uri = format!("unix://{}", path.display());

    let mut server = SocketServer::bind(&uri, &ServerConfig::default()).unwrap();
    assert_eq!(server.address(), Some(uri.clone()));

    let connector = Connector::new().unwrap();
    let client = tokio::spawn(async move { connector.connect(&uri).await.unwrap() });

    assert!(matches!(server.next_event().await, Some(ServerEvent::Connection(_))));
    assert!(!client.await.unwrap().is_encrypted());

    server.close();
    let _ = std::fs::remove_file(&path);
}
