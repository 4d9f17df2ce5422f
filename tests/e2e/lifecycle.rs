//! Start/stop behaviour of the top-level services

use super::helpers::*;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use turnfile::commands::interrupt;
use turnfile::config::GameRules;
use turnfile::coordinator::Matchmaker;
use turnfile::error::ProtocolError;
use turnfile::heartbeat::{self, HeartbeatRegistry};
use turnfile::peer::Automated;
use turnfile::services::Service;

#[test]
#[serial]
fn test_duplicate_coordinator_fails_fast() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());

    let result = Matchmaker::start(
        &root.layout,
        &root.config,
        GameRules::default(),
        &HeartbeatRegistry::new(),
    );
    let err = result.err().expect("second coordinator should be rejected");
    assert!(matches!(
        err.downcast_ref::<ProtocolError>(),
        Some(ProtocolError::CoordinatorAlreadyRunning { .. })
    ));

    coordinator.stop();
    wait_for_condition(
        || !heartbeat::is_active(&root.layout.server_heartbeat(), &root.config),
        STEP_TIMEOUT_MS,
    )
    .unwrap();
    let restarted = root.coordinator(GameRules::default());
    restarted.stop();
}

#[test]
#[serial]
fn test_stop_is_idempotent_everywhere() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());
    let never_started = root.peer("idle", GameRules::default(), Arc::new(Automated::new()));
    never_started.stop();
    never_started.stop();

    let running = root.peer("busy", GameRules::default(), Arc::new(Automated::new()));
    record_outcome(&running);
    running.stop();
    running.stop();

    coordinator.stop();
    coordinator.stop();
    assert!(root.registry.is_empty());
}

#[test]
#[serial]
fn test_operator_interrupt_reaches_coordinator() {
    let root = TestRoot::new();
    let coordinator = root.coordinator(GameRules::default());
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    coordinator
        .on_interrupt(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    interrupt::execute(&root.layout).unwrap();
    wait_for_condition(|| interrupted.load(Ordering::SeqCst), STEP_TIMEOUT_MS)
        .expect("interrupt should be observed");
    assert!(!root.registry.contains(&root.layout.server_heartbeat()));

    coordinator.stop();
}
