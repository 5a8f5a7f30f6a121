use witness_scan::ingest::{HeightStatus, IngestLedger};

#[test]
fn test_schedule_respects_limit_and_order() {
    let mut ledger = IngestLedger::new(100, 3);
    assert_eq!(ledger.position(), Some(99));
    assert_eq!(ledger.schedule(110, 4), vec![100, 101, 102, 103]);
    assert_eq!(ledger.status(104), None);
    assert_eq!(ledger.schedule(99, 4), Vec::<u64>::new());
}

#[test]
fn test_position_waits_for_failed_height() {
    let mut ledger = IngestLedger::new(0, 3);
    ledger.schedule(2, 10);

    let status = ledger.record_failure(0, "timeout", true);
    assert!(matches!(status, HeightStatus::Failed { attempts: 1, .. }));
    ledger.record_success(1);
    ledger.record_success(2);
    assert_eq!(ledger.position(), None);

    // Only the failed height is scheduled again
    assert_eq!(ledger.schedule(2, 10), vec![0]);
    ledger.record_success(0);
    assert_eq!(ledger.position(), Some(2));
    assert_eq!(ledger.next_height(), 3);
}

#[test]
fn test_retries_exhausted_abandons_height() {
    let mut ledger = IngestLedger::new(5, 2);
    ledger.schedule(5, 1);

    ledger.record_failure(5, "503", true);
    let status = ledger.record_failure(5, "503", true);
    assert_eq!(
        status,
        HeightStatus::Abandoned {
            attempts: 2,
            last_error: "503".to_string()
        }
    );
    assert_eq!(ledger.abandoned(), vec![5]);
    assert_eq!(ledger.position(), Some(5));
}

#[test]
fn test_terminal_failure_abandons_immediately() {
    let mut ledger = IngestLedger::new(0, 10);
    ledger.schedule(0, 1);
    let status = ledger.record_failure(0, "bad block", false);
    assert!(matches!(status, HeightStatus::Abandoned { attempts: 1, .. }));
    assert!(status.is_settled());
}
