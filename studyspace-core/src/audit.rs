use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::SeatBooking;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    BookingCreated,
    BookingCancelled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::BookingCreated => "booking_created",
            AuditAction::BookingCancelled => "booking_cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "booking_created" => Some(AuditAction::BookingCreated),
            "booking_cancelled" => Some(AuditAction::BookingCancelled),
            _ => None,
        }
    }
}

/// Append-only audit record written in the same atomic unit as the change
/// it describes. Has no read dependency, so it never widens the conflict
/// footprint of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub library_id: String,
    pub action: AuditAction,
    pub booking_id: Uuid,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn booking_created(booking: &SeatBooking, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            library_id: booking.library_id.clone(),
            action: AuditAction::BookingCreated,
            booking_id: booking.id,
            detail: format!(
                "seat {}/{} booked by {} for [{}, {})",
                booking.room_id,
                booking.seat_id,
                booking.student_id,
                booking.start_time,
                booking.end_time
            ),
            recorded_at: at,
        }
    }

    pub fn booking_cancelled(library_id: &str, booking_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            library_id: library_id.to_string(),
            action: AuditAction::BookingCancelled,
            booking_id,
            detail: "booking cancelled".to_string(),
            recorded_at: at,
        }
    }
}
