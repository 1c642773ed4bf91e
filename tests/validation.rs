//! End-to-end validation against local fake proxies.
//!
//! The fake proxy answers plain HTTP requests with 200 and refuses CONNECT
//! tunnels with 403, so HTTP probes pass and HTTPS probes fail.

use proxy_checker::{
    all_protocols, report, Candidate, EngineConfig, ProbeConfig, Protocol, ProxyAddress,
    ProxyParser, Summary, ValidationEngine,
};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn http_only_proxy() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let response = if buf[..n].starts_with(b"CONNECT") {
                    "HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                } else {
                    "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}"
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn engine(workers: usize) -> ValidationEngine {
    ValidationEngine::with_probe_config(
        EngineConfig::new()
            .with_workers(workers)
            .with_timeout(Duration::from_secs(5)),
        ProbeConfig::new()
            .with_http_url("http://liveness.test/ip".to_string())
            .with_https_url("https://liveness.test/ip".to_string()),
    )
}

#[tokio::test]
async fn validates_parsed_proxy_list() {
    let good = http_only_proxy().await;
    let dead = closed_port().await;

    let list = format!(
        "# local proxies\n{}\nhttps://{}\nsocks5://{}\n{}\n",
        good, good, dead, dead
    );
    let candidates = ProxyParser::parse_string(&list);
    // The https:// line repeats the first address and is dropped
    assert_eq!(candidates.len(), 2);

    let results = engine(4).validate(candidates).await.unwrap();
    assert_eq!(results.len(), 2);

    let good_result = results
        .iter()
        .find(|r| r.address.port == good.port())
        .unwrap();
    assert!(good_result.http_ok);
    assert!(!good_result.https_ok);
    assert!(good_result.latency_ms.is_some());
    assert!(good_result.error.is_some());

    let dead_result = results
        .iter()
        .find(|r| r.address.port == dead.port())
        .unwrap();
    assert!(!dead_result.is_working());
    assert!(dead_result.latency_ms.is_none());
    assert!(dead_result.error.is_some());

    let summary = Summary::from_results(&results);
    assert_eq!(summary.total_checked, 2);
    assert_eq!(summary.working, 1);
    assert_eq!(summary.http_working, 1);
    assert_eq!(summary.https_working, 0);

    let table = report::fastest_table(&results, 10);
    assert!(table.contains(&good.to_string()));
    assert!(!table.contains(&dead.to_string()));
    assert_eq!(
        report::format_working_list(&results),
        format!("{}\n", good)
    );
}

#[tokio::test]
async fn unclaimed_protocols_are_never_probed() {
    let good = http_only_proxy().await;
    let address = ProxyAddress::new(good.ip().to_string(), good.port());

    let candidates = vec![
        Candidate::new(address.clone(), BTreeSet::new()),
        Candidate::new(address.clone(), BTreeSet::from([Protocol::Http])),
        Candidate::new(address, all_protocols()),
    ];

    let results = engine(1).validate(candidates).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().filter(|r| r.is_working()).count(), 2);

    let none = results.iter().find(|r| !r.is_working()).unwrap();
    assert!(none.error.is_none());
    assert!(none.latency_ms.is_none());
}
