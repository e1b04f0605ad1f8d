use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::prepare_node;
use super::Ring;
use crate::dht::Did;
use crate::dht::Stabilizer;
use crate::dht::StabilizerIntervals;
use crate::dht::SuccessorReader;
use crate::error::Error;
use crate::error::Result;
use crate::message::FindSuccessorSend;
use crate::message::MessageHandler;
use crate::message::Request;
use crate::transport::MemoryTransport;

#[tokio::test]
async fn test_sole_member() -> Result<()> {
    let ring = Ring::with_nodes(1, 3).await;
    let node = &ring.nodes[0];

    assert_eq!(node.dht().successor()?, *node.node());
    assert_eq!(node.dht().predecessor()?, Some(node.node().clone()));
    assert!(node.dht().successors().is_empty()?);

    for key in ["apple", "banana", "cherry"] {
        let report = node.lookup(Did::from_key(key), 0).await?;
        assert_eq!(report.node, *node.node());
        assert_eq!(report.hops, 0);
    }

    // a lonely stabilization changes nothing
    Stabilizer::new(node.clone()).run_once().await;
    assert_eq!(node.dht().successor()?, *node.node());
    assert_eq!(node.dht().predecessor()?, Some(node.node().clone()));
    Ok(())
}

#[tokio::test]
async fn test_two_nodes_join() -> Result<()> {
    let transport = Arc::new(MemoryTransport::new());
    let a = prepare_node(&transport, "node-a", 3);
    let b = prepare_node(&transport, "node-b", 3);
    a.create()?;
    b.join("node-a").await?;

    // b knows a right after join, a learns b from the notify
    assert_eq!(b.dht().successor()?, *a.node());
    assert_eq!(a.dht().predecessor()?, Some(b.node().clone()));

    Stabilizer::new(a.clone()).stabilize().await?;
    Stabilizer::new(b.clone()).stabilize().await?;

    assert_eq!(a.dht().successor()?, *b.node());
    assert_eq!(b.dht().successor()?, *a.node());
    assert_eq!(a.dht().predecessor()?, Some(b.node().clone()));
    assert_eq!(b.dht().predecessor()?, Some(a.node().clone()));
    Ok(())
}

#[tokio::test]
async fn test_ring_closure() -> Result<()> {
    let ring = Ring::with_nodes(8, 3).await;
    assert!(ring.is_closed());

    // following successors from any node visits every node once
    let sorted = ring.sorted();
    let start = sorted[0].node().clone();
    let mut cur = sorted[0].clone();
    let mut visited = vec![];
    loop {
        visited.push(cur.did());
        let next = cur.dht().successor()?;
        if next == start {
            break;
        }
        cur = ring.node(&next.endpoint);
    }
    assert_eq!(visited, sorted.iter().map(|n| n.did()).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn test_fingers_point_to_successors() -> Result<()> {
    let ring = Ring::with_nodes(6, 3).await;
    for node in ring.nodes.iter() {
        let finger = node.dht().lock_finger()?.clone();
        for k in [0, 1, 80, 155, 159] {
            let start = node.did().finger_start(k as u32);
            let expected = ring.expected_owner(start);
            match finger.get(k) {
                // the finger table never holds self
                None => assert_eq!(expected.did(), node.did()),
                Some(f) => assert_eq!(f.did, expected.did()),
            }
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_routing_consistency() -> Result<()> {
    let ring = Ring::with_nodes(8, 3).await;

    for i in 0..40 {
        let did = Did::from_key(&format!("key-{}", i));
        let expected = ring.expected_owner(did);
        for node in ring.nodes.iter() {
            let report = node.lookup(did, 0).await?;
            assert_eq!(
                report.node,
                *expected.node(),
                "lookup of {} from {}",
                did,
                node.node()
            );
            assert!(report.hops <= 8);
        }
    }

    // joins went through node-0, node-1 only counts its own lookups
    let stats = ring.nodes[1].stats().await?;
    assert_eq!(stats.lookups, 40);
    Ok(())
}

#[tokio::test]
async fn test_routing_exhausted() -> Result<()> {
    let ring = Ring::with_nodes(3, 3).await;
    let node = ring.nodes[1].clone();
    let did = Did::from_key("apple");

    let err = node.lookup(did, 65).await.unwrap_err();
    assert!(matches!(err, Error::RoutingExhausted { hops: 65, .. }));

    let err = MessageHandler::new(node)
        .handle_request(Request::FindSuccessor(FindSuccessorSend { did, hops: 100 }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RoutingExhausted { .. }));
    Ok(())
}

#[tokio::test]
async fn test_join_rejects_duplicate_identifier() -> Result<()> {
    let ring = Ring::with_nodes(3, 3).await;
    let existing = ring.nodes[1].node().endpoint.clone();

    // same endpoint, same identifier, not registered so the ring keeps the original node
    let dup = Arc::new(
        crate::swarm::SwarmBuilder::new(&existing, ring.transport.clone())
            .build()?,
    );
    let err = dup.join(&ring.nodes[0].node().endpoint).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = ring.nodes[0]
        .join(&ring.nodes[0].node().endpoint)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let lonely = prepare_node(&ring.transport, "node-lonely", 3);
    let err = lonely.join("node-missing").await.unwrap_err();
    assert!(matches!(err, Error::Unreachable(_)));
    Ok(())
}

#[tokio::test]
async fn test_failed_predecessor_is_dropped() -> Result<()> {
    let mut ring = Ring::with_nodes(4, 3).await;
    let sorted = ring.sorted();
    let victim = sorted[1].clone();
    let next = sorted[2].clone();
    ring.kill(&victim.node().endpoint);

    Stabilizer::new(next.clone()).check_predecessor().await?;
    assert_eq!(next.dht().predecessor()?, None);

    ring.settle().await;
    assert!(ring.is_closed());
    assert_eq!(next.dht().predecessor()?, Some(sorted[0].node().clone()));
    for node in ring.nodes.iter() {
        assert!(!node.dht().successors().contains(&victim.did())?);
    }
    Ok(())
}

#[tokio::test]
async fn test_stabilizer_loops() -> Result<()> {
    let mut ring = Ring::new(3);
    for i in 0..4 {
        ring.add_node(&format!("loop-{}", i)).await;
    }
    let intervals = StabilizerIntervals {
        stabilize: Duration::from_millis(10),
        fix_fingers: Duration::from_millis(5),
        check_predecessor: Duration::from_millis(10),
        sweep: Duration::from_millis(20),
    };
    let token = CancellationToken::new();
    let mut handles = vec![];
    for node in ring.nodes.iter() {
        handles.extend(Arc::new(Stabilizer::new(node.clone())).spawn(&intervals, token.clone()));
    }

    let mut closed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if ring.is_closed() {
            closed = true;
            break;
        }
    }
    assert!(closed);

    token.cancel();
    for h in handles {
        tokio::time::timeout(Duration::from_secs(1), h)
            .await
            .expect("stabilizer loop did not stop")
            .unwrap();
    }
    Ok(())
}
