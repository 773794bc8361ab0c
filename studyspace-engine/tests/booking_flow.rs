use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use studyspace_core::booking::{BookingRequest, BookingStatus};
use studyspace_core::billing::BillStatus;
use studyspace_core::duration::DurationSpec;
use studyspace_core::seat::{CustomPricing, Seat, SeatTier};
use studyspace_core::{BookingError, StoreError};
use studyspace_engine::BookingEngine;
use studyspace_store::MemoryStore;

const LIB: &str = "lib-1";
const ROOM: &str = "room-1";

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn seat(seat_id: &str, tier: SeatTier, custom_pricing: Option<CustomPricing>) -> Seat {
    Seat {
        library_id: LIB.into(),
        room_id: ROOM.into(),
        seat_id: seat_id.into(),
        tier,
        custom_pricing,
    }
}

fn store_with_fixtures() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.seed_seat(seat("S1", SeatTier::Standard, None));
    store.seed_seat(seat("S2", SeatTier::Premium, None));
    store.seed_student(LIB, "ST1", "Asha Rao");
    store.seed_student(LIB, "ST2", "Deepak Kumar");
    store
}

fn request(seat_id: &str, student_id: &str, start: DateTime<Utc>, duration: DurationSpec) -> BookingRequest {
    BookingRequest {
        library_id: LIB.into(),
        room_id: ROOM.into(),
        seat_id: seat_id.into(),
        student_id: student_id.into(),
        student_name: student_id.to_string(),
        start_time: start,
        duration,
    }
}

#[tokio::test]
async fn booking_commits_booking_and_bill_together() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());

    let start = at(2024, 3, 1, 9, 0);
    let receipt = engine
        .create_booking(&request("S1", "ST1", start, DurationSpec::Hourly { hours: 4 }))
        .await
        .unwrap();

    let booking = store.booking(receipt.booking_id).unwrap();
    assert_eq!(booking.start_time, start);
    assert_eq!(booking.end_time, at(2024, 3, 1, 13, 0));
    assert_eq!(booking.status, BookingStatus::Active);
    assert_eq!(booking.seat_tier, SeatTier::Standard);
    assert_eq!(booking.linked_bill_id, receipt.bill_id);

    let bill = store.bill(receipt.bill_id).unwrap();
    assert_eq!(bill.booking_id, receipt.booking_id);
    assert_eq!(bill.total_amount, 160);
    assert_eq!(bill.subtotal + bill.taxes, bill.total_amount);
    assert_eq!(bill.status, BillStatus::Due);

    assert_eq!(store.audit_entries().len(), 1);
}

#[tokio::test]
async fn overlapping_seat_booking_reports_offending_window() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());

    engine
        .create_booking(&request(
            "S1",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap();

    let err = engine
        .create_booking(&request(
            "S1",
            "ST2",
            at(2024, 3, 1, 11, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap_err();

    match err {
        BookingError::SeatConflict { start, end } => {
            assert_eq!(start, at(2024, 3, 1, 9, 0));
            assert_eq!(end, at(2024, 3, 1, 13, 0));
        }
        other => panic!("expected SeatConflict, got {:?}", other),
    }
    assert_eq!(store.booking_count(), 1);
}

#[tokio::test]
async fn back_to_back_bookings_share_a_boundary() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());

    engine
        .create_booking(&request(
            "S1",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap();
    engine
        .create_booking(&request(
            "S1",
            "ST2",
            at(2024, 3, 1, 13, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap();

    assert_eq!(store.booking_count(), 2);
}

#[tokio::test]
async fn student_cannot_hold_two_overlapping_seats() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());

    engine
        .create_booking(&request(
            "S1",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 6 },
        ))
        .await
        .unwrap();

    let err = engine
        .create_booking(&request(
            "S2",
            "ST1",
            at(2024, 3, 1, 12, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::StudentConflict { .. }));
}

#[tokio::test]
async fn seat_overrides_price_the_bill() {
    let store = store_with_fixtures();
    store.seed_seat(seat(
        "S3",
        SeatTier::Basic,
        Some(CustomPricing {
            hourly: Some(100),
            ..Default::default()
        }),
    ));
    let engine = BookingEngine::new(store.clone());

    let receipt = engine
        .create_booking(&request(
            "S3",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap();

    assert_eq!(store.bill(receipt.bill_id).unwrap().total_amount, 400);
}

#[tokio::test]
async fn unknown_seat_and_student_are_not_found() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());
    let start = at(2024, 3, 1, 9, 0);

    let err = engine
        .create_booking(&request("S9", "ST1", start, DurationSpec::Daily))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)));

    let err = engine
        .create_booking(&request("S1", "ST9", start, DurationSpec::Daily))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)));
}

#[tokio::test]
async fn malformed_requests_fail_fast() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());
    let start = at(2024, 3, 1, 9, 0);

    let mut req = request("S1", "ST1", start, DurationSpec::Daily);
    req.student_id = String::new();
    assert!(matches!(
        engine.create_booking(&req).await.unwrap_err(),
        BookingError::InvalidRequest(_)
    ));

    let req = request("S1", "ST1", start, DurationSpec::Hourly { hours: 3 });
    assert!(matches!(
        engine.create_booking(&req).await.unwrap_err(),
        BookingError::InvalidDuration(_)
    ));
    assert_eq!(store.booking_count(), 0);
}

#[tokio::test]
async fn failed_bill_write_leaves_no_partial_state() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());

    store.fail_next_bill_inserts(1);
    let err = engine
        .create_booking(&request(
            "S1",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BookingError::Store(StoreError::Backend(_))
    ));
    assert_eq!(store.booking_count(), 0);
    assert_eq!(store.bill_count(), 0);
    assert!(store.audit_entries().is_empty());
}

#[tokio::test]
async fn commit_races_are_retried_within_budget() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());

    store.fail_next_commits(2);
    engine
        .create_booking(&request(
            "S1",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap();
    assert_eq!(store.booking_count(), 1);
}

#[tokio::test]
async fn exhausted_retry_budget_is_a_transient_failure() {
    let store = store_with_fixtures();
    let engine = BookingEngine::with_max_attempts(store.clone(), 3);

    store.fail_next_commits(10);
    let err = engine
        .create_booking(&request(
            "S1",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BookingError::TransientFailure { attempts: 3 }
    ));
    assert_eq!(store.booking_count(), 0);
}

#[tokio::test]
async fn concurrent_bookings_for_one_seat_admit_one_winner() {
    let store = store_with_fixtures();
    for i in 0..8 {
        store.seed_student(LIB, &format!("ST-c{}", i), "load test");
    }
    let engine = Arc::new(BookingEngine::with_max_attempts(store.clone(), 20));

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .create_booking(&request(
                    "S1",
                    &format!("ST-c{}", i),
                    at(2024, 3, 1, 9, 0),
                    DurationSpec::Hourly { hours: 4 },
                ))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(BookingError::SeatConflict { .. }) => {}
            Err(other) => panic!("unexpected error under contention: {:?}", other),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(store.booking_count(), 1);
    assert_eq!(store.bill_count(), 1);
}

#[tokio::test]
async fn concurrent_bookings_for_one_student_admit_one_winner() {
    let store = store_with_fixtures();
    for i in 0..6 {
        store.seed_seat(seat(&format!("S-c{}", i), SeatTier::Basic, None));
    }
    let engine = Arc::new(BookingEngine::with_max_attempts(store.clone(), 20));

    let mut handles = Vec::new();
    for i in 0..6 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .create_booking(&request(
                    &format!("S-c{}", i),
                    "ST1",
                    at(2024, 3, 1, 9, 0),
                    DurationSpec::Hourly { hours: 4 },
                ))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(BookingError::StudentConflict { .. }) => {}
            Err(other) => panic!("unexpected error under contention: {:?}", other),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(store.booking_count(), 1);
}

#[tokio::test]
async fn cancel_retries_when_its_write_loses_a_race() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());

    let receipt = engine
        .create_booking(&request(
            "S1",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap();

    // A serialization clash on the cancel statement itself, not the commit,
    // must be retried rather than surfaced as a terminal store error.
    store.fail_next_cancel_writes(1);
    engine.cancel_booking(LIB, receipt.booking_id).await.unwrap();
    assert_eq!(
        store.booking(receipt.booking_id).unwrap().status,
        BookingStatus::Cancelled
    );

    store.fail_next_cancel_writes(10);
    let engine = BookingEngine::with_max_attempts(store.clone(), 3);
    let err = engine.cancel_booking(LIB, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BookingError::TransientFailure { attempts: 3 }));
}

#[tokio::test]
async fn cancellation_is_idempotent_and_frees_the_window() {
    let store = store_with_fixtures();
    let engine = BookingEngine::new(store.clone());

    let receipt = engine
        .create_booking(&request(
            "S1",
            "ST1",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap();

    engine.cancel_booking(LIB, receipt.booking_id).await.unwrap();
    assert_eq!(
        store.booking(receipt.booking_id).unwrap().status,
        BookingStatus::Cancelled
    );
    // second cancel is a no-op success
    engine.cancel_booking(LIB, receipt.booking_id).await.unwrap();
    // so is cancelling a booking that never existed
    engine.cancel_booking(LIB, Uuid::new_v4()).await.unwrap();

    // the bill outlives the cancellation untouched
    let bill = store.bill(receipt.bill_id).unwrap();
    assert_eq!(bill.status, BillStatus::Due);

    // and the freed window can be rebooked
    engine
        .create_booking(&request(
            "S1",
            "ST2",
            at(2024, 3, 1, 9, 0),
            DurationSpec::Hourly { hours: 4 },
        ))
        .await
        .unwrap();
}
