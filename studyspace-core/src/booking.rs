use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::DurationSpec;
use crate::error::BookingError;
use crate::seat::SeatTier;

/// Booking lifecycle status. Bookings are never mutated after creation
/// except for the one-way transition to `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(BookingStatus::Active),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A reservation of one seat by one student for the half-open window
/// `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatBooking {
    pub id: Uuid,
    pub library_id: String,
    pub room_id: String,
    pub seat_id: String,
    pub student_id: String,
    pub student_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: DurationSpec,
    pub seat_tier: SeatTier,
    pub status: BookingStatus,
    pub linked_bill_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for `create_booking`. Tenant and session identity arrive as
/// explicit fields; the engine holds no module-level defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub library_id: String,
    pub room_id: String,
    pub seat_id: String,
    pub student_id: String,
    pub student_name: String,
    pub start_time: DateTime<Utc>,
    pub duration: DurationSpec,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<(), BookingError> {
        for (field, value) in [
            ("library_id", &self.library_id),
            ("room_id", &self.room_id),
            ("seat_id", &self.seat_id),
            ("student_id", &self.student_id),
            ("student_name", &self.student_name),
        ] {
            if value.trim().is_empty() {
                return Err(BookingError::InvalidRequest(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        self.duration.validate()
    }
}

/// Identifiers of the two documents a successful booking commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub booking_id: Uuid,
    pub bill_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> BookingRequest {
        BookingRequest {
            library_id: "lib-1".into(),
            room_id: "room-1".into(),
            seat_id: "S1".into(),
            student_id: "ST1".into(),
            student_name: "Asha Rao".into(),
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            duration: DurationSpec::Hourly { hours: 4 },
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        let mut req = request();
        req.seat_id = "  ".into();
        assert!(matches!(
            req.validate(),
            Err(BookingError::InvalidRequest(_))
        ));
    }

    #[test]
    fn bad_duration_is_rejected_at_validation() {
        let mut req = request();
        req.duration = DurationSpec::Hourly { hours: 7 };
        assert!(matches!(
            req.validate(),
            Err(BookingError::InvalidDuration(_))
        ));
    }
}
