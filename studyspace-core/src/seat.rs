use serde::{Deserialize, Serialize};

/// Seat classification used as the default pricing bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatTier {
    Basic,
    Standard,
    Premium,
}

impl SeatTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatTier::Basic => "basic",
            SeatTier::Standard => "standard",
            SeatTier::Premium => "premium",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(SeatTier::Basic),
            "standard" => Some(SeatTier::Standard),
            "premium" => Some(SeatTier::Premium),
            _ => None,
        }
    }
}

/// Per-seat rate overrides, keyed by duration class. A `None` slot falls
/// through to the tier default table. Yearly bookings never consult these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPricing {
    pub hourly: Option<i64>,
    pub daily: Option<i64>,
    pub monthly: Option<i64>,
}

impl CustomPricing {
    pub fn is_empty(&self) -> bool {
        self.hourly.is_none() && self.daily.is_none() && self.monthly.is_none()
    }
}

/// Seat document as seen by the booking engine. Owned and mutated by the
/// seat-management side of the application; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub library_id: String,
    pub room_id: String,
    pub seat_id: String,
    pub tier: SeatTier,
    pub custom_pricing: Option<CustomPricing>,
}
