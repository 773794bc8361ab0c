use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

/// Facility opening hour; callers conventionally normalize daily bookings
/// to start here, but the engine does not depend on it.
pub const FACILITY_OPEN_HOUR: u32 = 9;
/// Facility closing hour; a daily booking always ends at this wall-clock
/// time on the start date.
pub const FACILITY_CLOSE_HOUR: u32 = 21;

/// Hourly bookings are sold in fixed blocks only.
const HOURLY_BLOCKS: [u32; 4] = [4, 6, 12, 24];

/// How long a seat is reserved for. Each shape carries its own payload;
/// anything outside these four classes is rejected as `InvalidDuration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurationSpec {
    Hourly { hours: u32 },
    Daily,
    Monthly { months: u32 },
    Yearly,
}

impl DurationSpec {
    pub fn validate(&self) -> Result<(), BookingError> {
        match self {
            DurationSpec::Hourly { hours } if !HOURLY_BLOCKS.contains(hours) => {
                Err(BookingError::InvalidDuration(format!(
                    "hourly bookings must be one of {:?} hours, got {}",
                    HOURLY_BLOCKS, hours
                )))
            }
            DurationSpec::Monthly { months } if *months == 0 => Err(
                BookingError::InvalidDuration("monthly bookings need at least one month".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Resolve the exclusive end of the booking window for a given start.
    pub fn end_time(&self, start: DateTime<Utc>) -> Result<DateTime<Utc>, BookingError> {
        self.validate()?;
        let end = match self {
            DurationSpec::Hourly { hours } => start + Duration::hours(i64::from(*hours)),
            DurationSpec::Daily => start
                .date_naive()
                .and_hms_opt(FACILITY_CLOSE_HOUR, 0, 0)
                .map(|naive| naive.and_utc())
                .ok_or_else(|| {
                    BookingError::InvalidDuration("facility close time out of range".into())
                })?,
            DurationSpec::Monthly { months } => start
                .checked_add_months(Months::new(*months))
                .ok_or_else(|| {
                    BookingError::InvalidDuration("monthly end date out of range".into())
                })?,
            DurationSpec::Yearly => start.checked_add_months(Months::new(12)).ok_or_else(|| {
                BookingError::InvalidDuration("yearly end date out of range".into())
            })?,
        };
        if end <= start {
            return Err(BookingError::InvalidDuration(format!(
                "booking would end at {} which is not after its start {}",
                end, start
            )));
        }
        Ok(end)
    }

    /// Human-readable label used on bill line items.
    pub fn describe(&self) -> String {
        match self {
            DurationSpec::Hourly { hours } => format!("{}-hour seat reservation", hours),
            DurationSpec::Daily => "full-day seat reservation".to_string(),
            DurationSpec::Monthly { months } if *months == 1 => {
                "monthly seat reservation".to_string()
            }
            DurationSpec::Monthly { months } => format!("{}-month seat reservation", months),
            DurationSpec::Yearly => "yearly seat reservation".to_string(),
        }
    }
}
