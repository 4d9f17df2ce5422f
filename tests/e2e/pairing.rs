//! Matchmaking: pairing notices and queue order

use super::helpers::*;
use serial_test::serial;
use std::thread;
use turnfile::config::GameRules;
use turnfile::services::Service;

#[test]
#[serial]
fn test_two_requests_share_one_session() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());
    let p1 = root.request("p1");
    let p2 = root.request("p2");

    wait_for_condition(
        || root.notice("p1").is_some() && root.notice("p2").is_some(),
        STEP_TIMEOUT_MS,
    )
    .expect("both requesters should be notified");

    let n1 = root.notice("p1").unwrap();
    let n2 = root.notice("p2").unwrap();
    assert_eq!(n1.session_id, n2.session_id);
    assert_eq!(n1.opponent_id, "p2");
    assert_eq!(n2.opponent_id, "p1");
    assert!(root.layout.session_dir(&n1.session_id).is_dir());

    p1.stop();
    p2.stop();
    coordinator.stop();
}

#[test]
#[serial]
fn test_third_request_waits_for_a_partner() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());
    let p1 = root.request("p1");
    wait_for_condition(|| coordinator.queue() == vec!["p1"], STEP_TIMEOUT_MS).unwrap();
    let p2 = root.request("p2");
    wait_for_condition(|| root.notice("p2").is_some(), STEP_TIMEOUT_MS).unwrap();
    let p3 = root.request("p3");

    wait_for_condition(|| coordinator.queue() == vec!["p3"], STEP_TIMEOUT_MS).unwrap();
    assert_eq!(root.notice("p1").unwrap().opponent_id, "p2");
    assert!(root.notice("p3").is_none());

    let p4 = root.request("p4");
    wait_for_condition(|| root.notice("p4").is_some(), STEP_TIMEOUT_MS).unwrap();
    assert_eq!(root.notice("p4").unwrap().opponent_id, "p3");
    assert_eq!(root.notice("p3").unwrap().opponent_id, "p4");

    for request in [p1, p2, p3, p4] {
        request.stop();
    }
    coordinator.stop();
}

#[test]
#[serial]
fn test_abandoned_request_is_skipped() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());

    let early = root.request("early");
    wait_for_condition(|| coordinator.queue() == vec!["early"], STEP_TIMEOUT_MS).unwrap();
    early.stop();
    wait_for_condition(
        || coordinator.queue().is_empty() && !root.layout.request_dir("early").exists(),
        STEP_TIMEOUT_MS,
    )
    .expect("abandoned request should leave the queue");

    let late1 = root.request("late1");
    wait_for_condition(|| coordinator.queue() == vec!["late1"], STEP_TIMEOUT_MS).unwrap();
    let late2 = root.request("late2");
    wait_for_condition(|| root.notice("late2").is_some(), STEP_TIMEOUT_MS).unwrap();

    assert_eq!(root.notice("late1").unwrap().opponent_id, "late2");
    thread::sleep(TICK * 3);
    assert!(root.notice("early").is_none());

    late1.stop();
    late2.stop();
    coordinator.stop();
}
