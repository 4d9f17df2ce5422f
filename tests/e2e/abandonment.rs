//! Disconnects in the middle of a game

use super::helpers::*;
use serial_test::serial;
use std::sync::Arc;
use turnfile::config::GameRules;
use turnfile::models::TurnStatus;
use turnfile::services::Service;

#[test]
#[serial]
fn test_remaining_participant_wins_on_abandonment() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());
    let p1 = root.peer("p1", GameRules::default(), Scripted::new(&[0]));
    let p2 = root.peer("p2", GameRules::default(), Arc::new(Stalling));
    let p1_outcome = record_outcome(&p1);
    let p2_outcome = record_outcome(&p2);

    wait_for_condition(|| p2.status() == Some(TurnStatus::YourTurn), STEP_TIMEOUT_MS)
        .expect("p2 should get the second turn");
    let session_id = p2.session_id().unwrap();
    let session_dir = root.layout.session_dir(&session_id);

    p2.stop();
    assert_eq!(*p2_outcome.lock().unwrap(), vec![Some(TurnStatus::YourTurn)]);

    assert_eq!(wait_for_outcome(&p1_outcome), Some(TurnStatus::Won));
    assert_eq!(p1_outcome.lock().unwrap().len(), 1);
    wait_for_condition(|| !session_dir.exists(), STEP_TIMEOUT_MS)
        .expect("session storage should be removed");

    coordinator.stop();
}

#[test]
#[serial]
fn test_abandoned_participant_slot_reads_lost() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());
    let p1 = root.peer("p1", GameRules::default(), Arc::new(Stalling));
    let p2 = root.peer("p2", GameRules::default(), Arc::new(Stalling));
    record_outcome(&p1);
    let p2_outcome = record_outcome(&p2);

    wait_for_condition(|| p1.status() == Some(TurnStatus::YourTurn), STEP_TIMEOUT_MS).unwrap();
    let session_id = p1.session_id().unwrap();

    p1.stop();
    assert_eq!(wait_for_outcome(&p2_outcome), Some(TurnStatus::Won));

    // The departed participant's slot holds exactly one LOST, with no move.
    let reply = root.reply(&session_id, "p1");
    assert!(matches!(reply.as_deref(), Some("LOST") | None));

    coordinator.stop();
}

#[test]
#[serial]
fn test_coordinator_loss_ends_waiting_peer() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());
    let lonely = root.peer("lonely", GameRules::default(), Arc::new(Stalling));
    let outcome = record_outcome(&lonely);
    wait_for_condition(|| coordinator.queue() == vec!["lonely"], STEP_TIMEOUT_MS).unwrap();

    coordinator.stop();
    assert_eq!(wait_for_outcome(&outcome), Some(TurnStatus::Error));
    assert!(lonely.is_stopped());
}
