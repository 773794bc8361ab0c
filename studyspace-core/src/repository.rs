use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::billing::Bill;
use crate::booking::SeatBooking;
use crate::seat::Seat;

/// Faults surfaced by a store implementation. `Serialization` is the one
/// retryable kind: the transaction's read set was invalidated by a
/// concurrent commit and the whole read-decide-write cycle must rerun.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization conflict, transaction must be retried")]
    Serialization,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Handle to the transactional document store. Object safe so callers can
/// hold it as `Arc<dyn BookingStore>` regardless of backend.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Server-assigned timestamp used for `created_at` / `issued_at`.
    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError>;

    /// Open a transaction. All reads observe one consistent snapshot and
    /// all writes land atomically at commit, or not at all.
    async fn begin(&self) -> Result<Box<dyn BookingTxn>, StoreError>;
}

/// One optimistic transaction over the booking collections. Dropping the
/// handle without committing abandons every buffered write.
#[async_trait]
pub trait BookingTxn: Send {
    /// Point read of a seat document, including pricing overrides.
    async fn seat(
        &mut self,
        library_id: &str,
        room_id: &str,
        seat_id: &str,
    ) -> Result<Option<Seat>, StoreError>;

    async fn student_exists(
        &mut self,
        library_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError>;

    /// Active bookings for the seat whose `end_time` is after `cutoff`.
    /// The caller applies the second half of the overlap test.
    async fn active_seat_bookings_ending_after(
        &mut self,
        library_id: &str,
        room_id: &str,
        seat_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SeatBooking>, StoreError>;

    /// Active bookings for the student, any seat, ending after `cutoff`.
    async fn active_student_bookings_ending_after(
        &mut self,
        library_id: &str,
        student_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SeatBooking>, StoreError>;

    async fn insert_booking(&mut self, booking: &SeatBooking) -> Result<(), StoreError>;

    async fn insert_bill(&mut self, bill: &Bill) -> Result<(), StoreError>;

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Mark an active booking cancelled. Returns whether a booking was
    /// actually retired, so callers can implement idempotent cancellation.
    async fn cancel_booking(
        &mut self,
        library_id: &str,
        booking_id: Uuid,
    ) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
