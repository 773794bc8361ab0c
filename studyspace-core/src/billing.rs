use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::SeatBooking;
use crate::duration::DurationSpec;

/// Days after issuance before a bill falls due.
pub const BILL_DUE_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Due,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Due => "due",
            BillStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "due" => Some(BillStatus::Due),
            "paid" => Some(BillStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub total: i64,
}

/// Financial record paired one-to-one with a booking, created in the same
/// atomic unit. Immutable once issued; payment and refunds belong to a
/// separate financial workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub library_id: String,
    pub student_id: String,
    pub student_name: String,
    pub booking_id: Uuid,
    pub line_items: Vec<LineItem>,
    pub subtotal: i64,
    pub taxes: i64,
    pub total_amount: i64,
    pub status: BillStatus,
    pub issued_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl Bill {
    /// Build the bill for a booking whose price has already been resolved
    /// (seat overrides included). The quantity reflects the duration class:
    /// hours for hourly plans, months for monthly plans, one unit otherwise.
    /// Every valid amount is `rate * quantity`, so the split stays exact.
    ///
    /// The reference rate table is tax-inclusive, so taxes stay at zero.
    pub fn for_booking(
        bill_id: Uuid,
        booking: &SeatBooking,
        amount: i64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let quantity = match &booking.duration {
            DurationSpec::Hourly { hours } => i64::from(*hours),
            DurationSpec::Monthly { months } => i64::from(*months),
            DurationSpec::Daily | DurationSpec::Yearly => 1,
        };
        let item = LineItem {
            description: format!(
                "Seat {} ({} tier), {}",
                booking.seat_id,
                booking.seat_tier.as_str(),
                booking.duration.describe()
            ),
            quantity,
            unit_price: amount / quantity,
            total: amount,
        };
        let subtotal: i64 = item.total;
        Self {
            id: bill_id,
            library_id: booking.library_id.clone(),
            student_id: booking.student_id.clone(),
            student_name: booking.student_name.clone(),
            booking_id: booking.id,
            line_items: vec![item],
            subtotal,
            taxes: 0,
            total_amount: subtotal,
            status: BillStatus::Due,
            issued_at,
            due_date: issued_at + Duration::days(BILL_DUE_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingStatus;
    use crate::seat::SeatTier;
    use chrono::TimeZone;

    fn booking(duration: DurationSpec, end: DateTime<Utc>) -> SeatBooking {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        SeatBooking {
            id: Uuid::new_v4(),
            library_id: "lib-1".into(),
            room_id: "room-1".into(),
            seat_id: "S1".into(),
            student_id: "ST1".into(),
            student_name: "Asha Rao".into(),
            start_time: start,
            end_time: end,
            duration,
            seat_tier: SeatTier::Standard,
            status: BookingStatus::Active,
            linked_bill_id: Uuid::new_v4(),
            created_at: start,
        }
    }

    #[test]
    fn hourly_bill_splits_into_hours() {
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        let b = booking(DurationSpec::Hourly { hours: 4 }, end);
        let bill = Bill::for_booking(Uuid::new_v4(), &b, 160, b.created_at);
        assert_eq!(bill.line_items.len(), 1);
        assert_eq!(bill.line_items[0].quantity, 4);
        assert_eq!(bill.line_items[0].unit_price, 40);
        assert_eq!(bill.subtotal, 160);
        assert_eq!(bill.taxes, 0);
        assert_eq!(bill.total_amount, 160);
        assert_eq!(bill.status, BillStatus::Due);
    }

    #[test]
    fn totals_stay_consistent() {
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let b = booking(DurationSpec::Monthly { months: 3 }, end);
        let bill = Bill::for_booking(Uuid::new_v4(), &b, 18000, b.created_at);
        let items_total: i64 = bill.line_items.iter().map(|i| i.total).sum();
        assert_eq!(bill.total_amount, bill.subtotal + bill.taxes);
        assert_eq!(bill.total_amount, items_total);
        assert_eq!(bill.due_date, bill.issued_at + Duration::days(BILL_DUE_DAYS));
    }
}
