use std::sync::Arc;
use std::time::Duration;

use chordkv_core::dht::Did;
use chordkv_core::error::Error as CoreError;
use chordkv_rpc::prelude::reqwest;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::cli::Client;
use crate::error::Error;
use crate::error::Result;
use crate::native::config::Config;
use crate::native::endpoint::bind_http_api;
use crate::native::endpoint::serve;
use crate::processor::Processor;
use crate::processor::ProcessorBuilder;

/// A node serving on a free local port, with fast maintenance loops.
pub async fn prepare_processor(join: Option<&str>) -> (Arc<Processor>, JoinHandle<Result<()>>) {
    let listener = bind_http_api("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let mut config = Config::new(&addr);
    config.join = join.map(|j| j.to_string());
    config.replication_factor = 2;
    config.rpc_timeout_ms = 2000;
    config.stabilize_interval_ms = 100;
    config.fix_fingers_interval_ms = 50;
    config.check_predecessor_interval_ms = 200;
    config.sweep_interval_ms = 200;

    let processor = Arc::new(ProcessorBuilder::from_config(&config).build().unwrap());
    let server = tokio::spawn(serve(listener, processor.clone()));
    processor
        .join_or_create(config.join.as_deref())
        .await
        .unwrap();
    processor.start_maintenance().unwrap();
    (processor, server)
}

fn is_closed(processors: &[Arc<Processor>]) -> bool {
    let mut sorted: Vec<_> = processors.iter().map(|p| p.swarm.clone()).collect();
    sorted.sort_by_key(|s| s.did());
    let n = sorted.len();
    (0..n).all(|i| {
        let next = sorted[(i + 1) % n].node().clone();
        let prev = sorted[(i + n - 1) % n].node().clone();
        sorted[i].dht().successor().ok() == Some(next)
            && sorted[i].dht().predecessor().ok() == Some(Some(prev))
    })
}

async fn wait_closed(processors: &[Arc<Processor>]) {
    for _ in 0..150 {
        if is_closed(processors) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("ring did not close");
}

fn client_of(processor: &Processor) -> Client {
    Client::new(&processor.swarm.node().endpoint, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_http_ring_round_trip() {
    let (p1, _s1) = prepare_processor(None).await;
    let bootstrap = p1.swarm.node().endpoint.clone();
    let (p2, _s2) = prepare_processor(Some(&bootstrap)).await;
    let (p3, _s3) = prepare_processor(Some(&bootstrap)).await;
    let processors = vec![p1.clone(), p2.clone(), p3.clone()];
    wait_closed(&processors).await;

    let c1 = client_of(&p1);
    let c3 = client_of(&p3);

    let stored = c1.put("apple", "red").await.unwrap().result;
    assert_eq!(stored.replicas, 1);

    let got = c3.get("apple").await.unwrap().result.unwrap();
    assert_eq!(got.value, b"red".to_vec());
    assert_eq!(got.version, stored.version);
    assert!(c3.get("banana").await.unwrap().result.is_none());

    // every node agrees on the owner
    let owner = c1.find("apple").await.unwrap().result.node;
    assert_eq!(owner, stored.owner);
    assert_eq!(client_of(&p2).find("apple").await.unwrap().result.node, owner);
    let did = Did::from_key("apple").to_string();
    assert_eq!(c3.find(&did).await.unwrap().result.node, owner);

    let stats = c1.stats().await.unwrap().result;
    assert_eq!(stats.node, *p1.swarm.node());
    assert_eq!(stats.replication_factor, 2);

    let deleted = c3.delete("apple").await.unwrap().result;
    assert!(deleted.existed);
    assert!(c1.get("apple").await.unwrap().result.is_none());

    for p in processors {
        p.shutdown().await.unwrap();
    }
}

#[tokio::test]
async fn test_http_errors_and_status() {
    let (p, server) = prepare_processor(None).await;
    let client = client_of(&p);

    let e = client.get("").await.err().unwrap();
    assert!(matches!(
        e.downcast_ref::<Error>(),
        Some(Error::CoreError(CoreError::InvalidArgument(_)))
    ));

    let url = format!("http://{}/", p.swarm.node().endpoint);
    let http = reqwest::Client::new();
    let resp: serde_json::Value = http
        .post(&url)
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "connectPeerViaHttp", "params": {}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["error"]["code"], -32601);

    let resp = http.get(format!("{}status", url)).send().await.unwrap();
    assert!(resp.headers().contains_key("X-NODE-VERSION"));
    let status: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(status["node"]["endpoint"], p.swarm.node().endpoint);

    p.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
