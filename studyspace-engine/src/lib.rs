//! The booking engine: validates a reservation request, detects seat and
//! student conflicts against a transactional snapshot, prices the stay,
//! and commits the booking together with its bill as one atomic unit.
//!
//! Concurrency control is delegated entirely to the store's optimistic
//! transaction primitive; the engine holds no locks or shared mutable
//! state of its own and simply reruns the read-decide-write cycle when a
//! commit loses a race.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use studyspace_core::audit::AuditEntry;
use studyspace_core::billing::Bill;
use studyspace_core::booking::{BookingReceipt, BookingRequest, BookingStatus, SeatBooking};
use studyspace_core::conflict;
use studyspace_core::pricing;
use studyspace_core::{BookingError, BookingResult, BookingStore, BookingTxn, StoreError};

/// Default bound on optimistic transaction retries before the outcome is
/// reported as indeterminate.
pub const DEFAULT_MAX_TXN_ATTEMPTS: u32 = 5;

pub struct BookingEngine {
    store: Arc<dyn BookingStore>,
    max_attempts: u32,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_TXN_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(store: Arc<dyn BookingStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Validate, price, and commit a new booking plus its bill.
    ///
    /// Conflict errors are business outcomes and are returned as soon as a
    /// consistent snapshot shows them. Only serialization clashes are
    /// retried, up to the configured budget.
    pub async fn create_booking(&self, request: &BookingRequest) -> BookingResult<BookingReceipt> {
        request.validate()?;
        let end_time = request.duration.end_time(request.start_time)?;

        for attempt in 1..=self.max_attempts {
            match self.try_create(request, end_time).await {
                Err(BookingError::Store(StoreError::Serialization)) => {
                    debug!(
                        attempt,
                        seat = %request.seat_id,
                        student = %request.student_id,
                        "booking transaction lost a write race, retrying"
                    );
                }
                Ok(receipt) => {
                    info!(
                        booking_id = %receipt.booking_id,
                        bill_id = %receipt.bill_id,
                        seat = %request.seat_id,
                        student = %request.student_id,
                        start = %request.start_time,
                        end = %end_time,
                        "booking committed"
                    );
                    return Ok(receipt);
                }
                Err(err) => return Err(err),
            }
        }

        warn!(
            seat = %request.seat_id,
            student = %request.student_id,
            attempts = self.max_attempts,
            "booking outcome indeterminate after exhausting retry budget"
        );
        Err(BookingError::TransientFailure {
            attempts: self.max_attempts,
        })
    }

    async fn try_create(
        &self,
        request: &BookingRequest,
        end_time: DateTime<Utc>,
    ) -> BookingResult<BookingReceipt> {
        let now = self.store.server_time().await?;
        let mut txn = self.store.begin().await?;

        let seat = txn
            .seat(&request.library_id, &request.room_id, &request.seat_id)
            .await?
            .ok_or_else(|| {
                BookingError::NotFound(format!(
                    "seat {}/{} in library {}",
                    request.room_id, request.seat_id, request.library_id
                ))
            })?;

        if !txn
            .student_exists(&request.library_id, &request.student_id)
            .await?
        {
            return Err(BookingError::NotFound(format!(
                "student {} in library {}",
                request.student_id, request.library_id
            )));
        }

        let seat_rows = txn
            .active_seat_bookings_ending_after(
                &request.library_id,
                &request.room_id,
                &request.seat_id,
                request.start_time,
            )
            .await?;
        if let Some(hit) = conflict::first_overlap(request.start_time, end_time, &seat_rows) {
            return Err(BookingError::SeatConflict {
                start: hit.start_time,
                end: hit.end_time,
            });
        }

        let student_rows = txn
            .active_student_bookings_ending_after(
                &request.library_id,
                &request.student_id,
                request.start_time,
            )
            .await?;
        if let Some(hit) = conflict::first_overlap(request.start_time, end_time, &student_rows) {
            return Err(BookingError::StudentConflict {
                start: hit.start_time,
                end: hit.end_time,
            });
        }

        let amount = pricing::quote(&request.duration, seat.tier, seat.custom_pricing.as_ref());

        let booking_id = Uuid::new_v4();
        let bill_id = Uuid::new_v4();
        let booking = SeatBooking {
            id: booking_id,
            library_id: request.library_id.clone(),
            room_id: request.room_id.clone(),
            seat_id: request.seat_id.clone(),
            student_id: request.student_id.clone(),
            student_name: request.student_name.clone(),
            start_time: request.start_time,
            end_time,
            duration: request.duration.clone(),
            seat_tier: seat.tier,
            status: BookingStatus::Active,
            linked_bill_id: bill_id,
            created_at: now,
        };
        let bill = Bill::for_booking(bill_id, &booking, amount, now);

        txn.insert_booking(&booking).await?;
        txn.insert_bill(&bill).await?;
        txn.append_audit(&AuditEntry::booking_created(&booking, now))
            .await?;
        txn.commit().await?;

        Ok(BookingReceipt {
            booking_id,
            bill_id,
        })
    }

    /// Cancel a booking, freeing its seat and student for the window.
    ///
    /// Idempotent: cancelling an already-cancelled or unknown booking is a
    /// no-op success, which keeps external retries safe. The paired bill is
    /// never touched.
    pub async fn cancel_booking(&self, library_id: &str, booking_id: Uuid) -> BookingResult<()> {
        if library_id.trim().is_empty() {
            return Err(BookingError::InvalidRequest(
                "library_id must not be empty".into(),
            ));
        }

        for attempt in 1..=self.max_attempts {
            match self.try_cancel(library_id, booking_id).await {
                Err(BookingError::Store(StoreError::Serialization)) => {
                    debug!(attempt, %booking_id, "cancel transaction lost a write race, retrying");
                }
                other => return other,
            }
        }

        Err(BookingError::TransientFailure {
            attempts: self.max_attempts,
        })
    }

    async fn try_cancel(&self, library_id: &str, booking_id: Uuid) -> BookingResult<()> {
        let now = self.store.server_time().await?;
        let mut txn = self.store.begin().await?;
        let retired = txn.cancel_booking(library_id, booking_id).await?;
        if retired {
            txn.append_audit(&AuditEntry::booking_cancelled(library_id, booking_id, now))
                .await?;
        }
        txn.commit().await?;
        if retired {
            info!(%booking_id, library = %library_id, "booking cancelled");
        } else {
            debug!(%booking_id, library = %library_id, "cancel was a no-op");
        }
        Ok(())
    }
}
