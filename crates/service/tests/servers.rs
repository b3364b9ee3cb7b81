//! End-to-end `Servers` calls against the scenario dataset

use std::io::Write;

use tokio_util::sync::CancellationToken;

use authority_config::ServerConfig;
use authority_protocol::{ErrorKind, ServerMsg, ServersRequest};
use authority_service::{Authority, AuthorityClient, AuthorityServer, StreamError};

const DATASET: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/test/data.json");

struct Case {
    desc: &'static str,
    request: ServersRequest,
    /// None = the call must fail with InvalidPattern
    want: Option<Vec<&'static str>>,
}

fn cases() -> Vec<Case> {
    let all = vec![
        "server1", "server2", "server3", "server4", "server5", "server6", "server7", "server8",
        "server9", "server10", "1server", "2server", "server40",
    ];

    vec![
        Case {
            desc: "bad regex",
            request: ServersRequest::new().with_name_filter("(what"),
            want: None,
        },
        Case {
            desc: "filter by name only",
            request: ServersRequest::new().with_name_filter(r"\d+server"),
            want: Some(vec!["1server", "2server"]),
        },
        Case {
            desc: "filter by datacenter only",
            request: ServersRequest::new().with_datacenters(["ab"]),
            want: Some(vec!["1server", "2server", "server40"]),
        },
        Case {
            desc: "filter by name and datacenter",
            request: ServersRequest::new()
                .with_name_filter(r"server\d+")
                .with_datacenters(["ab"]),
            want: Some(vec!["server40"]),
        },
        Case {
            desc: "no filter",
            request: ServersRequest::new(),
            want: Some(all),
        },
    ]
}

/// Names as a sorted list, so duplicates still count
fn sorted<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = names.into_iter().map(str::to_string).collect();
    names.sort();
    names
}

async fn start(dataset: &std::path::Path) -> (String, CancellationToken) {
    let config = ServerConfig {
        address: "127.0.0.1:0".into(),
        ..Default::default()
    };
    let server = AuthorityServer::new(Authority::new(dataset), config);
    let listener = server.bind().await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let cancel = CancellationToken::new();
    tokio::spawn(server.serve(listener, cancel.clone()));
    (address, cancel)
}

#[tokio::test]
async fn test_scenarios_in_process() {
    let authority = Authority::new(DATASET);

    for case in cases() {
        let mut sink: Vec<ServerMsg> = Vec::new();
        let result = authority
            .servers(&case.request, &mut sink, &CancellationToken::new())
            .await;

        match case.want {
            None => assert!(
                matches!(result, Err(StreamError::InvalidPattern { .. })),
                "{}: expected InvalidPattern, got {result:?}",
                case.desc
            ),
            Some(want) => {
                let sent = result.unwrap_or_else(|e| panic!("{}: {e}", case.desc));
                assert_eq!(sent as usize, sink.len(), "{}", case.desc);
                assert_eq!(
                    sorted(sink.iter().map(|s| s.name.as_str())),
                    sorted(want),
                    "{}",
                    case.desc
                );
            }
        }
    }
}

#[tokio::test]
async fn test_scenarios_over_tcp() {
    let (address, cancel) = start(std::path::Path::new(DATASET)).await;

    for case in cases() {
        let client = AuthorityClient::connect(&address).await.unwrap();
        let result = client.collect(&case.request).await;

        match case.want {
            None => {
                let err = result.unwrap_err();
                assert_eq!(err.kind(), Some(ErrorKind::InvalidPattern), "{}", case.desc);
            }
            Some(want) => {
                let names = result.unwrap_or_else(|e| panic!("{}: {e}", case.desc));
                assert_eq!(
                    sorted(names.iter().map(String::as_str)),
                    sorted(want),
                    "{}",
                    case.desc
                );
            }
        }
    }

    cancel.cancel();
}

#[tokio::test]
async fn test_duplicate_names_all_delivered() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let records = [
        ("server1", "aa"),
        ("server1", "ab"),
        ("server2", "ab"),
        ("server1", "ab"),
    ];
    for (name, dc) in records {
        writeln!(file, r#"{{"Name": "{name}", "Datacenter": "{dc}"}}"#).unwrap();
    }
    let (address, cancel) = start(file.path()).await;

    let client = AuthorityClient::connect(&address).await.unwrap();
    let names = client.collect(&ServersRequest::new()).await.unwrap();
    assert_eq!(names, vec!["server1", "server1", "server2", "server1"]);

    let client = AuthorityClient::connect(&address).await.unwrap();
    let names = client
        .collect(
            &ServersRequest::new()
                .with_name_filter("^server1$")
                .with_datacenters(["ab"]),
        )
        .await
        .unwrap();
    assert_eq!(names, vec!["server1", "server1"]);

    cancel.cancel();
}

#[tokio::test]
async fn test_scan_order_follows_file_order() {
    let authority = Authority::new(DATASET);
    let mut sink: Vec<ServerMsg> = Vec::new();

    authority
        .servers(
            &ServersRequest::new().with_datacenters(["ab"]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let names: Vec<&str> = sink.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["1server", "2server", "server40"]);
}
