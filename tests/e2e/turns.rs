//! Turn relay between two peers through the coordinator

use super::helpers::*;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use turnfile::config::GameRules;
use turnfile::fs::{io, Layout};
use turnfile::models::TurnStatus;
use turnfile::peer::{Automated, Peer};
use turnfile::services::{Publisher, Service};

/// Capture the peer's reply file at the moment it publishes its outcome.
fn record_final_reply(peer: &Peer, layout: &Layout) -> Arc<Mutex<Option<String>>> {
    let reply = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&reply);
    let observed = peer.clone();
    let layout = layout.clone();
    peer.subscribe(move |_: &Option<TurnStatus>| {
        if let Some(session_id) = observed.session_id() {
            *sink.lock().unwrap() =
                io::read(&layout.participant_reply(&session_id, observed.id()));
        }
        Ok(())
    })
    .unwrap();
    reply
}

#[test]
#[serial]
fn test_alternating_turns_until_win() {
    let root = TestRoot::new();
    let rules = GameRules::new(3, 2).unwrap();
    let coordinator = root.coordinator(rules);

    // p1 moves first: 0, then 1 completes two in a row.
    let first = Scripted::new(&[0, 1]);
    let second = Scripted::new(&[4]);
    let p1 = root.peer("p1", rules, first.clone());
    let p2 = root.peer("p2", rules, second.clone());
    let p1_reply = record_final_reply(&p1, &root.layout);
    let p2_reply = record_final_reply(&p2, &root.layout);
    let p1_outcome = record_outcome(&p1);
    let p2_outcome = record_outcome(&p2);

    assert_eq!(wait_for_outcome(&p1_outcome), Some(TurnStatus::Won));
    assert_eq!(wait_for_outcome(&p2_outcome), Some(TurnStatus::Lost));

    // p1 opened with no prior move and then saw p2's reply; p2 saw p1's
    // opener once and was never asked again after losing.
    assert_eq!(first.views(), vec![None, Some(4)]);
    assert_eq!(second.views(), vec![Some(0)]);
    assert_eq!(p1_reply.lock().unwrap().as_deref(), Some("WON\n1"));
    assert_eq!(p2_reply.lock().unwrap().as_deref(), Some("LOST\n1"));
    assert_eq!(p1.session_id(), p2.session_id());

    coordinator.stop();
}

#[test]
#[serial]
fn test_session_storage_removed_after_game() {
    let root = TestRoot::new();
    let rules = GameRules::new(3, 2).unwrap();
    let coordinator = root.coordinator(rules);
    let p1 = root.peer("p1", rules, Scripted::new(&[0, 1]));
    let p2 = root.peer("p2", rules, Scripted::new(&[4]));
    let p1_outcome = record_outcome(&p1);
    let p2_outcome = record_outcome(&p2);

    wait_for_condition(|| p1.session_id().is_some(), STEP_TIMEOUT_MS).unwrap();
    let session_dir = root.layout.session_dir(&p1.session_id().unwrap());
    wait_for_outcome(&p1_outcome);
    wait_for_outcome(&p2_outcome);

    wait_for_condition(|| !session_dir.exists(), STEP_TIMEOUT_MS)
        .expect("session should clean up after both peers leave");
    wait_for_condition(|| coordinator.sessions() == 0, STEP_TIMEOUT_MS).unwrap();
    wait_for_condition(
        || !root.layout.request_dir("p1").exists() && !root.layout.request_dir("p2").exists(),
        STEP_TIMEOUT_MS,
    )
    .unwrap();

    coordinator.stop();
}

#[test]
#[serial]
fn test_automated_game_reaches_an_outcome() {
    let root = TestRoot::new();
    let rules = GameRules::new(4, 3).unwrap();
    let coordinator = root.coordinator(rules);
    let a = root.peer("a", rules, Arc::new(Automated::new()));
    let b = root.peer("b", rules, Arc::new(Automated::new()));
    let a_outcome = record_outcome(&a);
    let b_outcome = record_outcome(&b);

    let pair = (wait_for_outcome(&a_outcome), wait_for_outcome(&b_outcome));
    assert!(
        matches!(
            pair,
            (Some(TurnStatus::Won), Some(TurnStatus::Lost))
                | (Some(TurnStatus::Lost), Some(TurnStatus::Won))
                | (Some(TurnStatus::Tie), Some(TurnStatus::Tie))
        ),
        "unexpected outcome {pair:?}"
    );

    coordinator.stop();
}
