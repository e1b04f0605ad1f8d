use std::time::Duration;

use super::Ring;
use crate::dht::Did;
use crate::error::Error;
use crate::error::Result;
use crate::message::MessageHandler;
use crate::message::ReplicatePushSend;
use crate::message::Request;
use crate::message::Response;
use crate::storage::Entry;
use crate::storage::Role;

fn value_of(key: &str) -> Vec<u8> {
    format!("value of {}", key).into_bytes()
}

#[tokio::test]
async fn test_put_get_from_any_node() -> Result<()> {
    let ring = Ring::with_nodes(4, 3).await;
    let keys: Vec<String> = (0..20).map(|i| format!("fruit-{}", i)).collect();

    for (i, key) in keys.iter().enumerate() {
        let via = &ring.nodes[i % ring.nodes.len()];
        let report = via.put(key, value_of(key), 0).await?;
        let owner = ring.expected_owner(Did::from_key(key));
        assert_eq!(report.owner, *owner.node());
        assert_eq!(report.replicas, 2);
    }

    for key in keys.iter() {
        for node in ring.nodes.iter() {
            let entry = node.get(key).await?.expect("key must be found");
            assert_eq!(entry.value, value_of(key));
            assert_eq!(entry.key, *key);
        }
        let owner = ring.expected_owner(Did::from_key(key));
        assert_eq!(ring.primaries(key).await, vec![owner.node().endpoint.clone()]);
        assert_eq!(ring.copies(key).await.len(), 3);
    }
    Ok(())
}

#[tokio::test]
async fn test_overwrite_bumps_version() -> Result<()> {
    let ring = Ring::with_nodes(4, 3).await;
    let first = ring.nodes[0].put("apple", b"red".to_vec(), 0).await?;
    let second = ring.nodes[2].put("apple", b"green".to_vec(), 0).await?;
    assert!(second.version > first.version);

    for (_, entry) in ring.copies("apple").await {
        assert_eq!(entry.value, b"green".to_vec());
        assert_eq!(entry.version, second.version);
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_key_and_invalid_arguments() -> Result<()> {
    let ring = Ring::with_nodes(3, 3).await;
    for node in ring.nodes.iter() {
        assert_eq!(node.get("never-written").await?, None);
    }

    let err = ring.nodes[0].put("", b"x".to_vec(), 0).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    let err = ring.nodes[0].get("").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    let big = vec![0u8; crate::consts::MAX_VALUE_LEN + 1];
    let err = ring.nodes[0].put("big", big, 0).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    Ok(())
}

#[tokio::test]
async fn test_delete_drops_replicas() -> Result<()> {
    let ring = Ring::with_nodes(4, 3).await;
    ring.nodes[0].put("apple", b"red".to_vec(), 0).await?;
    assert_eq!(ring.copies("apple").await.len(), 3);

    let report = ring.nodes[3].delete("apple", 0).await?;
    assert!(report.existed);
    assert_eq!(report.replicas, 2);
    assert!(ring.copies("apple").await.is_empty());
    for node in ring.nodes.iter() {
        assert_eq!(node.get("apple").await?, None);
    }

    let report = ring.nodes[1].delete("apple", 0).await?;
    assert!(!report.existed);
    Ok(())
}

#[tokio::test]
async fn test_replicate_push_is_idempotent() -> Result<()> {
    let ring = Ring::with_nodes(3, 3).await;
    let target = ring.nodes[1].clone();
    let entry = Entry::new("apple", b"red".to_vec(), 7, Role::Primary);

    let handler = MessageHandler::new(target.clone());
    let push = Request::ReplicatePush(ReplicatePushSend {
        entry: entry.clone(),
    });

    let first = handler.handle_request(push.clone()).await?;
    assert!(matches!(first, Response::Ack(ref ack) if ack.changed));
    let after_first = target.store().entries().await?;

    for _ in 0..3 {
        let again = handler.handle_request(push.clone()).await?;
        assert!(matches!(again, Response::Ack(ref ack) if !ack.changed));
    }
    assert_eq!(target.store().entries().await?, after_first);
    assert_eq!(after_first, vec![entry.with_role(Role::Replica)]);

    // an older version never overwrites a newer one
    let stale = Entry::new("apple", b"old".to_vec(), 3, Role::Primary);
    assert!(!ring.nodes[0].client().replicate_push(target.node(), stale).await?);
    assert_eq!(target.store().entries().await?, after_first);
    Ok(())
}

#[tokio::test]
async fn test_keys_survive_node_failure() -> Result<()> {
    let mut ring = Ring::with_nodes(4, 3).await;
    let keys: Vec<String> = (0..5).map(|i| format!("berry-{}", i)).collect();
    for key in keys.iter() {
        ring.nodes[0].put(key, value_of(key), 0).await?;
    }

    // kill the owner of the first key
    let victim = ring.expected_owner(Did::from_key(&keys[0]));
    ring.kill(&victim.node().endpoint);
    drop(victim);

    // every key is readable right away, served by replicas
    for key in keys.iter() {
        for node in ring.nodes.iter() {
            let entry = node.get(key).await?.expect("key must survive");
            assert_eq!(entry.value, value_of(key));
        }
    }

    // once the ring healed, each key has exactly one primary at its new owner
    ring.settle().await;
    assert!(ring.is_closed());
    for key in keys.iter() {
        let owner = ring.expected_owner(Did::from_key(key));
        assert_eq!(ring.primaries(key).await, vec![owner.node().endpoint.clone()]);
        assert_eq!(ring.copies(key).await.len(), 3);
        for node in ring.nodes.iter() {
            assert_eq!(node.get(key).await?.map(|e| e.value), Some(value_of(key)));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_node_without_predecessor_resolves_owners() -> Result<()> {
    let mut ring = Ring::with_nodes(5, 3).await;
    let keys: Vec<String> = (0..20).map(|i| format!("melon-{}", i)).collect();
    for key in keys.iter() {
        ring.nodes[0].put(key, value_of(key), 0).await?;
    }

    let sorted = ring.sorted();
    let next = sorted[2].clone();
    let far = sorted[4].clone();
    let far_key = (0..)
        .map(|i| format!("lime-{}", i))
        .find(|k| ring.expected_owner(Did::from_key(k)).did() == far.did())
        .unwrap();
    ring.nodes[0].put(&far_key, b"old".to_vec(), 0).await?;
    let own_key = (0..)
        .map(|i| format!("fig-{}", i))
        .find(|k| ring.expected_owner(Did::from_key(k)).did() == next.did())
        .unwrap();
    ring.nodes[0].put(&own_key, value_of(&own_key), 0).await?;

    ring.kill(&sorted[1].node().endpoint);
    ring.check_predecessors().await;
    assert_eq!(next.dht().predecessor()?, None);

    // reads through the node that lost its predecessor still reach every key
    for key in keys.iter().chain([&own_key]) {
        for node in ring.nodes.iter() {
            let entry = node.get(key).await?;
            assert_eq!(entry.map(|e| e.value), Some(value_of(key)), "{} via {}", key, node.node());
        }
    }

    // a write through it lands at the true owner, not locally
    let report = next.put(&far_key, b"new".to_vec(), 0).await?;
    assert_eq!(report.owner, *far.node());
    assert_eq!(ring.primaries(&far_key).await, vec![far.node().endpoint.clone()]);
    let stored = far.store().get(Did::from_key(&far_key)).await?.unwrap();
    assert_eq!(stored.value, b"new".to_vec());
    assert_eq!(next.get(&far_key).await?.map(|e| e.value), Some(b"new".to_vec()));

    // and it hands nothing over while its range is unknown
    let (primaries, _) = next.store().counts().await?;
    assert!(primaries > 0);
    let taken = next.transfer_keys(sorted[0].did(), next.did()).await?;
    assert!(taken.is_empty());
    assert_eq!(next.store().counts().await?.0, primaries);
    Ok(())
}

#[tokio::test]
async fn test_keys_survive_two_adjacent_failures() -> Result<()> {
    let mut ring = Ring::with_nodes(6, 3).await;
    let keys: Vec<String> = (0..30).map(|i| format!("peach-{}", i)).collect();
    for (i, key) in keys.iter().enumerate() {
        ring.nodes[i % 6].put(key, value_of(key), 0).await?;
    }

    let sorted = ring.sorted();
    ring.kill(&sorted[1].node().endpoint);
    ring.kill(&sorted[2].node().endpoint);
    drop(sorted);

    for round in 0..2 {
        if round == 1 {
            ring.check_predecessors().await;
        }
        for key in keys.iter() {
            for node in ring.nodes.iter() {
                let entry = node.get(key).await?;
                assert_eq!(
                    entry.map(|e| e.value),
                    Some(value_of(key)),
                    "{} via {} in round {}",
                    key,
                    node.node(),
                    round
                );
            }
        }
    }

    ring.settle().await;
    assert!(ring.is_closed());
    for key in keys.iter() {
        let owner = ring.expected_owner(Did::from_key(key));
        assert_eq!(ring.primaries(key).await, vec![owner.node().endpoint.clone()]);
        assert_eq!(ring.copies(key).await.len(), 3);
    }
    Ok(())
}

#[tokio::test]
async fn test_slow_replica_does_not_fail_forwarded_put() -> Result<()> {
    let ring = Ring::with_nodes_and_timeout(4, 3, Duration::from_millis(200)).await;
    let sorted = ring.sorted();
    let (via, owner, slow) = (sorted[0].clone(), sorted[1].clone(), sorted[2].clone());
    let key = (0..)
        .map(|i| format!("kiwi-{}", i))
        .find(|k| ring.expected_owner(Did::from_key(k)).did() == owner.did())
        .unwrap();
    let did = Did::from_key(&key);

    // the owner waits a full timeout on its first replica target before moving on
    ring.stalling.stall(&slow.node().endpoint);
    let report = via.put(&key, b"green".to_vec(), 0).await?;
    assert_eq!(report.owner, *owner.node());
    assert_eq!(report.replicas, 2);
    assert_eq!(
        owner.store().get(did).await?.map(|e| e.value),
        Some(b"green".to_vec())
    );
    ring.stalling.resume(&slow.node().endpoint);

    // a stalled owner is read around, and stays in the ring view of the reader
    ring.stalling.stall(&owner.node().endpoint);
    let entry = via.get(&key).await?.expect("replica must answer");
    assert_eq!(entry.value, b"green".to_vec());
    assert_eq!(via.dht().successor()?, *owner.node());
    ring.stalling.resume(&owner.node().endpoint);
    Ok(())
}

#[tokio::test]
async fn test_join_moves_keys_without_loss_or_duplication() -> Result<()> {
    let mut ring = Ring::with_nodes(4, 3).await;
    let keys: Vec<String> = (0..30).map(|i| format!("grape-{}", i)).collect();
    for (i, key) in keys.iter().enumerate() {
        ring.nodes[i % 4].put(key, value_of(key), 0).await?;
    }

    let newcomer = ring.add_node("node-new").await;
    ring.settle().await;
    assert!(ring.is_closed());

    let mut moved = 0;
    for key in keys.iter() {
        let owner = ring.expected_owner(Did::from_key(key));
        if owner.did() == newcomer.did() {
            moved += 1;
        }
        assert_eq!(
            ring.primaries(key).await,
            vec![owner.node().endpoint.clone()],
            "primary of {}",
            key
        );
        for node in ring.nodes.iter() {
            assert_eq!(node.get(key).await?.map(|e| e.value), Some(value_of(key)));
        }
    }

    let (primary, _) = newcomer.store().counts().await?;
    assert_eq!(primary as usize, moved);

    let mut total = 0;
    for node in ring.nodes.iter() {
        total += node.store().counts().await?.0;
    }
    assert_eq!(total as usize, keys.len());
    Ok(())
}

#[tokio::test]
async fn test_key_unavailable_without_replicas() -> Result<()> {
    let mut ring = Ring::with_nodes(2, 1).await;
    let key = (0..)
        .map(|i| format!("plum-{}", i))
        .find(|k| ring.expected_owner(Did::from_key(k)).did() == ring.nodes[0].did())
        .unwrap();
    ring.nodes[0].put(&key, value_of(&key), 0).await?;
    assert_eq!(ring.copies(&key).await.len(), 1);

    let victim = ring.nodes[0].node().endpoint.clone();
    ring.kill(&victim);
    let err = ring.nodes[0].get(&key).await.unwrap_err();
    assert!(matches!(err, Error::KeyUnavailable(_)));
    Ok(())
}
