//! Tests for the TCP server (loopback, ephemeral ports)

use super::*;
use std::io::Write;

use tokio::io::AsyncWriteExt;

use authority_protocol::{MAX_FRAME_SIZE, ServerMsg};

use crate::client::AuthorityClient;
use crate::error::ClientError;

fn dataset(records: &[(&str, &str)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for (name, dc) in records {
        writeln!(file, r#"{{"Name": "{name}", "Datacenter": "{dc}"}}"#).unwrap();
    }
    file
}

fn test_config() -> ServerConfig {
    ServerConfig {
        address: "127.0.0.1:0".into(),
        ..Default::default()
    }
}

/// Start a server on an ephemeral port, returning its address
async fn start(
    authority: Authority,
    config: ServerConfig,
    cancel: &CancellationToken,
) -> (String, tokio::task::JoinHandle<Result<()>>) {
    let server = AuthorityServer::new(authority, config);
    let listener = server.bind().await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(server.serve(listener, cancel.clone()));
    (address, handle)
}

// ============================================================================
// Calls
// ============================================================================

#[tokio::test]
async fn test_call_streams_matches_then_closes() {
    let file = dataset(&[("server1", "aa"), ("1server", "ab"), ("server40", "ab")]);
    let cancel = CancellationToken::new();
    let (address, _server) = start(Authority::new(file.path()), test_config(), &cancel).await;

    let client = AuthorityClient::connect(&address).await.unwrap();
    let names = client
        .collect(&ServersRequest::new().with_datacenters(["ab"]))
        .await
        .unwrap();

    assert_eq!(names, vec!["1server", "server40"]);
    cancel.cancel();
}

#[tokio::test]
async fn test_invalid_pattern_reported_as_error_frame() {
    let file = dataset(&[("server1", "aa")]);
    let cancel = CancellationToken::new();
    let (address, _server) = start(Authority::new(file.path()), test_config(), &cancel).await;

    let mut client = AuthorityClient::connect(&address).await.unwrap();
    client
        .servers(&ServersRequest::new().with_name_filter("(what"))
        .await
        .unwrap();

    let err = client.recv().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidPattern));

    // Nothing after the terminal error
    assert!(client.recv().await.unwrap().is_none());
    cancel.cancel();
}

#[tokio::test]
async fn test_missing_dataset_reported_as_source_unavailable() {
    let cancel = CancellationToken::new();
    let (address, _server) = start(
        Authority::new("/nonexistent/data.json"),
        test_config(),
        &cancel,
    )
    .await;

    let client = AuthorityClient::connect(&address).await.unwrap();
    let err = client.collect(&ServersRequest::new()).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::SourceUnavailable));
    cancel.cancel();
}

#[tokio::test]
async fn test_oversized_match_ends_call_with_error_frame() {
    let huge = "s".repeat(MAX_FRAME_SIZE);
    let file = dataset(&[("server1", "aa"), (huge.as_str(), "aa"), ("server3", "aa")]);
    let cancel = CancellationToken::new();
    let (address, _server) = start(Authority::new(file.path()), test_config(), &cancel).await;

    let mut client = AuthorityClient::connect(&address).await.unwrap();
    client.servers(&ServersRequest::new()).await.unwrap();

    assert_eq!(
        client.recv().await.unwrap(),
        Some(ServerMsg::new("server1"))
    );
    let err = client.recv().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Protocol));
    assert!(err.to_string().contains("match not sendable"));

    assert!(client.recv().await.unwrap().is_none());
    cancel.cancel();
}

// ============================================================================
// Request handling
// ============================================================================

#[tokio::test]
async fn test_wrong_first_message_is_protocol_error() {
    let file = dataset(&[("server1", "aa")]);
    let cancel = CancellationToken::new();
    let (address, _server) = start(Authority::new(file.path()), test_config(), &cancel).await;

    let mut stream = TcpStream::connect(&address).await.unwrap();
    let bogus = Message::Server(ServerMsg::new("server1")).encode();
    stream.write_all(&bogus).await.unwrap();

    let mut decoder = FrameDecoder::new();
    loop {
        if let Some(msg) = decoder.decode_next().unwrap() {
            match msg {
                Message::Error(frame) => assert_eq!(frame.kind, ErrorKind::Protocol),
                other => panic!("expected Error, got {other:?}"),
            }
            break;
        }
        let n = stream.read_buf(decoder.buffer_mut()).await.unwrap();
        assert!(n > 0, "connection closed without an error frame");
    }
    cancel.cancel();
}

#[tokio::test]
async fn test_silent_client_times_out() {
    let file = dataset(&[("server1", "aa")]);
    let config = ServerConfig {
        request_timeout: Duration::from_millis(50),
        ..test_config()
    };
    let cancel = CancellationToken::new();
    let (address, _server) = start(Authority::new(file.path()), config, &cancel).await;

    let mut client = AuthorityClient::connect(&address).await.unwrap();
    let err = client.recv().await.unwrap_err();

    match err {
        ClientError::Remote { kind, message } => {
            assert_eq!(kind, ErrorKind::Protocol);
            assert!(message.contains("no request received"));
        }
        other => panic!("expected Remote, got {other:?}"),
    }
    cancel.cancel();
}

#[tokio::test]
async fn test_connections_over_limit_are_busy() {
    let file = dataset(&[("server1", "aa")]);
    let config = ServerConfig {
        max_connections: 1,
        ..test_config()
    };
    let cancel = CancellationToken::new();
    let (address, _server) = start(Authority::new(file.path()), config, &cancel).await;

    // Holds the only permit while it waits for its request
    let _first = AuthorityClient::connect(&address).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut second = AuthorityClient::connect(&address).await.unwrap();
    let err = second.recv().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Busy));
    cancel.cancel();
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_serve_returns_on_cancel() {
    let file = dataset(&[]);
    let cancel = CancellationToken::new();
    let (_address, server) = start(Authority::new(file.path()), test_config(), &cancel).await;

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(1), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_bind_failure_names_address() {
    let config = ServerConfig {
        address: "not-an-address".into(),
        ..Default::default()
    };
    let server = AuthorityServer::new(Authority::new("data.json"), config);

    match server.bind().await {
        Err(ServerError::Bind { address, .. }) => assert_eq!(address, "not-an-address"),
        other => panic!("expected Bind error, got {other:?}"),
    }
}
