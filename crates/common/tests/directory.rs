//! Integration tests for directory gossip between nodes

mod common;

use std::time::Duration;

use ::common::directory::Reachability;

#[tokio::test]
async fn test_gossip_spreads_through_intermediate_node() {
    let network = common::LoopbackNetwork::new();
    let a = common::spawn_node(&network, "a", &["b"]);
    let b = common::spawn_node(&network, "b", &[]);
    let c = common::spawn_node(&network, "c", &["b"]);

    // a and c only know b; b learns of both when they call in
    a.peer.directory().poll_once().await;
    c.peer.directory().poll_once().await;
    assert_eq!(c.peer.directory().resolve(&a.key().public), Some(common::url("a")));
    assert_eq!(b.peer.directory().resolve(&c.key().public), Some(common::url("c")));

    // a hears about c through b
    a.peer.directory().poll_once().await;
    assert_eq!(a.peer.directory().resolve(&c.key().public), Some(common::url("c")));
    assert!(a
        .peer
        .directory()
        .peers()
        .iter()
        .any(|p| p.address == common::url("c")));
}

#[tokio::test]
async fn test_self_entries_stay_local() {
    let network = common::LoopbackNetwork::new();
    let a = common::spawn_node(&network, "a", &["b"]);
    let b = common::spawn_node(&network, "b", &[]);

    a.peer.directory().poll_once().await;
    a.peer.directory().poll_once().await;

    assert_eq!(a.peer.directory().resolve(&a.key().public), Some(common::url("a")));
    assert_eq!(b.peer.directory().resolve(&b.key().public), Some(common::url("b")));
    assert_eq!(a.peer.directory().entries(), b.peer.directory().entries());
}

#[tokio::test(start_paused = true)]
async fn test_slow_peer_does_not_block_cycle() {
    let network = common::LoopbackNetwork::new();
    let a = common::spawn_node(&network, "a", &["slow", "fast"]);
    let slow = common::spawn_node(&network, "slow", &[]);
    let fast = common::spawn_node(&network, "fast", &[]);
    network.slow_down("slow", Duration::from_secs(30));

    let report = a.peer.directory().poll_once().await;
    assert_eq!(report.polled, 2);
    assert_eq!(report.reachable, 1);
    assert_eq!(report.unreachable, 1);

    assert_eq!(
        a.peer.directory().resolve(&fast.key().public),
        Some(common::url("fast"))
    );
    assert_eq!(a.peer.directory().resolve(&slow.key().public), None);

    let statuses = a.peer.directory().peers();
    let status = |name: &str| {
        statuses
            .iter()
            .find(|p| p.address == common::url(name))
            .map(|p| p.reachability)
    };
    assert_eq!(status("slow"), Some(Reachability::Unreachable));
    assert_eq!(status("fast"), Some(Reachability::Reachable));
    assert_eq!(status("a"), Some(Reachability::Reachable));
}

#[tokio::test]
async fn test_unreachable_peer_recovers() {
    let network = common::LoopbackNetwork::new();
    let a = common::spawn_node(&network, "a", &["b"]);
    let b = common::spawn_node(&network, "b", &[]);

    network.take_down("b");
    let report = a.peer.directory().poll_once().await;
    assert_eq!(report.unreachable, 1);
    assert!(a.peer.directory().resolve(&b.key().public).is_none());

    network.bring_up("b");
    let report = a.peer.directory().poll_once().await;
    assert_eq!(report.reachable, 1);
    assert_eq!(a.peer.directory().resolve(&b.key().public), Some(common::url("b")));

    let status = a
        .peer
        .directory()
        .peers()
        .into_iter()
        .find(|p| p.address == common::url("b"))
        .unwrap();
    assert_eq!(status.consecutive_failures, 0);
}
