use chrono::{DateTime, Utc};

use crate::repository::StoreError;

/// Error taxonomy of the booking engine. Conflict variants carry the
/// offending window so the caller can explain why a slot is unavailable,
/// not just that it is.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("seat is already booked from {start} to {end}")]
    SeatConflict {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("student already holds a booking from {start} to {end}")]
    StudentConflict {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    /// The store could not reconcile concurrent writes within the retry
    /// budget. The only variant worth retrying from the outside.
    #[error("booking could not be committed after {attempts} attempts")]
    TransientFailure { attempts: u32 },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub type BookingResult<T> = Result<T, BookingError>;
