//! TLS clients, secure servers and in-place upgrades over loopback.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use sockline_client::config::{
    ConnectorConfig, DnsSetting, PemSource, SchemeSetting, TcpListenConfig, TlsContextOptions,
};
use sockline_client::connect::{Connection, Connector, OpportunisticTlsConnection};
use sockline_client::dns::StaticResolver;
use sockline_client::server::{SecureServer, Server, ServerEvent, TcpServer};
use sockline_client::tls::{StreamEncryption, generate_self_signed};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

fn server_options() -> TlsContextOptions {
    options_for("localhost")
}

fn options_for(name: &str) -> TlsContextOptions {
    let generated = generate_self_signed(&[name]).unwrap();
    TlsContextOptions::default()
        .with_local_cert(PemSource::Inline(generated.cert_pem))
        .with_local_pk(PemSource::Inline(generated.key_pem))
}

fn secure_server() -> (SecureServer, u16) {
    secure_server_with(&server_options())
}

fn secure_server_with(options: &TlsContextOptions) -> (SecureServer, u16) {
    let inner = TcpServer::bind("127.0.0.1:0", &TcpListenConfig::default()).unwrap();
    let port = inner.local_addr().port();
    (SecureServer::new(inner, options).unwrap(), port)
}

fn tls_connector(options: TlsContextOptions, dns: DnsSetting) -> Connector {
    Connector::with_config(
        ConnectorConfig::default()
            .with_dns(dns)
            .with_tls(SchemeSetting::Enabled(options)),
    )
    .unwrap()
}

fn localhost() -> DnsSetting {
    let ip: IpAddr = "127.0.0.1".parse().unwrap();
    DnsSetting::Custom(Arc::new(StaticResolver::new().with_host("localhost", [ip])))
}

async fn accept(server: &mut SecureServer) -> Connection {
    match server.next_event().await {
        Some(ServerEvent::Connection(connection)) => connection,
        Some(ServerEvent::Error(e)) => panic!("unexpected server error: {e}"),
        None => panic!("server closed"),
    }
}

#[tokio::test]
async fn client_and_secure_server_exchange_data() {
    let (mut server, port) = secure_server();
    let connector = tls_connector(TlsContextOptions::insecure(), DnsSetting::Disabled);

    let serve = tokio::spawn(async move {
        let mut connection = accept(&mut server).await;
        assert!(connection.is_encrypted());
        assert!(connection.remote_address().unwrap().starts_with("tls://127.0.0.1:"));
        let mut buf = [0u8; 4];
        connection.read_exact(&mut buf).await.unwrap();
        connection.write_all(&buf).await.unwrap();
        connection.flush().await.unwrap();
    });

    let mut connection = connector.connect(&format!("tls://127.0.0.1:{port}")).await.unwrap();
    assert!(connection.is_encrypted());
    assert_eq!(connection.remote_address(), Some(format!("tls://127.0.0.1:{port}")));

    connection.write_all(b"ping").await.unwrap();
    connection.flush().await.unwrap();
    let mut buf = [0u8; 4];
    connection.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
    serve.await.unwrap();
}

#[tokio::test]
async fn self_signed_certificate_is_accepted_when_allowed() {
    let (mut server, port) = secure_server();
    let options = TlsContextOptions::default().with_allow_self_signed(true);
    let connector = tls_connector(options, localhost());

    let serve = tokio::spawn(async move { accept(&mut server).await });

    let connection = connector.connect(&format!("tls://localhost:{port}")).await.unwrap();
    assert!(connection.is_encrypted());
    serve.await.unwrap();
}

#[tokio::test]
async fn self_signed_certificate_for_other_host_is_rejected() {
    let (mut server, port) = secure_server_with(&options_for("other.test"));
    let options = TlsContextOptions::default().with_allow_self_signed(true);
    let connector = tls_connector(options, localhost());

    let uri = format!("tls://localhost:{port}");
    let err = connector.connect(&uri).await.unwrap_err();
    assert!(err.is_handshake());

    match server.next_event().await {
        Some(ServerEvent::Error(e)) => assert!(e.is_handshake()),
        other => panic!("expected a handshake error, got {other:?}"),
    }
}

#[tokio::test]
async fn self_signed_certificate_for_other_host_passes_without_name_check() {
    let (mut server, port) = secure_server_with(&options_for("other.test"));
    let options = TlsContextOptions::default()
        .with_allow_self_signed(true)
        .with_verify_peer_name(false);
    let connector = tls_connector(options, localhost());

    let serve = tokio::spawn(async move { accept(&mut server).await });

    let connection = connector.connect(&format!("tls://localhost:{port}")).await.unwrap();
    assert!(connection.is_encrypted());
    serve.await.unwrap();
}

#[tokio::test]
async fn tls_still_connects_with_tcp_disabled() {
    let (mut server, port) = secure_server();
    let connector = Connector::with_config(
        ConnectorConfig::default()
            .with_dns(DnsSetting::Disabled)
            .with_tcp(SchemeSetting::Disabled)
            .with_tls(SchemeSetting::Enabled(TlsContextOptions::insecure())),
    )
    .unwrap();
    assert!(!connector.supports("tcp"));
    assert!(connector.supports("tls"));

    let err = connector.connect(&format!("tcp://127.0.0.1:{port}")).await.unwrap_err();
    assert!(err.is_invalid_uri());
    assert_eq!(err.to_string(), "No connector available for URI scheme \"tcp\" (EINVAL)");

    let serve = tokio::spawn(async move { accept(&mut server).await });

    let connection = connector.connect(&format!("tls://127.0.0.1:{port}")).await.unwrap();
    assert!(connection.is_encrypted());
    assert!(serve.await.unwrap().is_encrypted());
}

#[tokio::test]
async fn untrusted_certificate_fails_both_sides() {
    let (mut server, port) = secure_server();
    let connector = tls_connector(TlsContextOptions::default(), localhost());

    let uri = format!("tls://localhost:{port}");
    let err = connector.connect(&uri).await.unwrap_err();
    assert!(err.is_handshake());
    assert!(err.to_string().starts_with(&format!("Connection to {uri} failed during TLS handshake: ")));

    match server.next_event().await {
        Some(ServerEvent::Error(e)) => assert!(e.is_handshake()),
        other => panic!("expected a handshake error, got {other:?}"),
    }
}

#[tokio::test]
async fn plaintext_peer_fails_client_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (closed_tx, closed_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = stream.write_all(b"HTTP/1.0 400 Bad Request\r\n\r\n").await;

        // Drain until the client drops the socket.
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = closed_tx.send(true);
    });

    let connector = tls_connector(TlsContextOptions::insecure(), DnsSetting::Disabled);
    let uri = format!("tls://127.0.0.1:{port}");
    let err = connector.connect(&uri).await.unwrap_err();
    assert!(err.is_handshake());
    assert!(err.to_string().starts_with(&format!("Connection to {uri} failed during TLS handshake: ")));

    let closed = timeout(Duration::from_secs(5), closed_rx).await.unwrap().unwrap();
    assert!(closed);
}

#[tokio::test]
async fn plaintext_client_is_reported_by_secure_server() {
    let (mut server, port) = secure_server();

    let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let local = client.local_addr().unwrap();
    client.write_all(b"hello there, not tls\r\n").await.unwrap();

    match server.next_event().await {
        Some(ServerEvent::Error(e)) => {
            assert!(e.is_handshake());
            assert!(e.to_string().starts_with(&format!(
                "Connection from tcp://{local} failed during TLS handshake: "
            )));
        }
        other => panic!("expected a handshake error, got {other:?}"),
    }
}

#[tokio::test]
async fn opportunistic_connection_upgrades_after_negotiation() {
    let listener = TcpServer::bind("127.0.0.1:0", &TcpListenConfig::default()).unwrap();
    let port = listener.local_addr().port();
    let encryption = StreamEncryption::server_from_options(&server_options()).unwrap();

    let serve = tokio::spawn(async move {
        let mut listener = listener;
        let Some(ServerEvent::Connection(connection)) = listener.next_event().await else {
            panic!("no connection");
        };
        let mut peer = OpportunisticTlsConnection::server(connection, encryption);

        let mut command = [0u8; 10];
        peer.read_exact(&mut command).await.unwrap();
        assert_eq!(&command, b"STARTTLS\r\n");
        peer.write_all(b"OK\r\n").await.unwrap();
        peer.enable_encryption().await.unwrap();
        assert!(peer.is_encrypted());

        let mut secret = [0u8; 6];
        peer.read_exact(&mut secret).await.unwrap();
        peer.write_all(&secret).await.unwrap();
        peer.flush().await.unwrap();
    });

    let connector = tls_connector(TlsContextOptions::insecure(), DnsSetting::Disabled);
    let mut connection = connector
        .connect_opportunistic(&format!("opportunistic+tls://127.0.0.1:{port}"))
        .await
        .unwrap();
    assert!(!connection.is_encrypted());

    connection.write_all(b"STARTTLS\r\n").await.unwrap();
    let mut reply = [0u8; 4];
    connection.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"OK\r\n");

    connection.enable_encryption().await.unwrap();
    assert!(connection.is_encrypted());
    assert_eq!(connection.remote_address(), Some(format!("tls://127.0.0.1:{port}")));
    connection.enable_encryption().await.unwrap();

    connection.write_all(b"secret").await.unwrap();
    connection.flush().await.unwrap();
    let mut echoed = [0u8; 6];
    connection.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"secret");
    serve.await.unwrap();
}

#[tokio::test]
async fn disabling_encryption_returns_to_plaintext() {
    let (mut server, port) = secure_server();
    let (plain_tx, plain_rx) = oneshot::channel();

    let serve = tokio::spawn(async move {
        let connection = accept(&mut server).await;
        let encryption = StreamEncryption::server_from_options(&server_options()).unwrap();
        let mut plain = encryption.disable(connection).await.unwrap();
        assert!(!plain.is_encrypted());
        plain_tx.send(()).unwrap();

        let mut buf = [0u8; 5];
        plain.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"clear");
    });

    let connector = tls_connector(TlsContextOptions::insecure(), DnsSetting::Disabled);
    let connection = connector.connect(&format!("tls://127.0.0.1:{port}")).await.unwrap();
    let encryption = StreamEncryption::client_from_options(&TlsContextOptions::insecure()).unwrap();
    let mut plain = encryption.disable(connection).await.unwrap();
    assert!(!plain.is_encrypted());
    assert_eq!(plain.remote_address(), Some(format!("tcp://127.0.0.1:{port}")));

    plain_rx.await.unwrap();
    plain.write_all(b"clear").await.unwrap();
    serve.await.unwrap();
}
