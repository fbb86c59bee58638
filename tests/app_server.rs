mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tether::demo;
use tether::server::AppServer;
use tether::tree::Phase;
use tether::view::Services;

use common::create_test_config;

/// The server binds an ephemeral port, serves until shutdown is signaled,
/// then disposes every session.
#[tokio::test]
async fn test_server_runs_until_shutdown() {
    let mut server = AppServer::new(create_test_config(), demo::factory(), Services::new());
    let addr = server.bind().await.expect("bind");
    assert_ne!(addr.port(), 0);

    let sessions = server.sessions();
    let (tree, _) = sessions
        .create(&CancellationToken::new())
        .await
        .expect("session");
    let shutdown = server.shutdown_handle();
    let handle = tokio::spawn(server.run());

    tokio::time::sleep(Duration::from_millis(20)).await;
    let stream = tokio::net::TcpStream::connect(addr).await;
    assert!(stream.is_ok(), "server accepts connections");
    drop(stream);

    shutdown.signal_shutdown();
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("server stops")
        .expect("join")
        .expect("clean exit");

    assert!(sessions.is_empty());
    assert_eq!(tree.phase().await, Phase::Disposed);
}

#[tokio::test]
async fn test_run_without_bind_fails() {
    let server = AppServer::new(create_test_config(), demo::factory(), Services::new());
    assert!(server.run().await.is_err());
}

#[tokio::test]
async fn test_bind_rejects_invalid_address() {
    let mut config = (*create_test_config()).clone();
    config.server.bind_addr = "not an address".to_string();
    let mut server = AppServer::new(Arc::new(config), demo::factory(), Services::new());
    assert!(server.bind().await.is_err());
}
