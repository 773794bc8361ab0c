use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use studyspace_core::audit::AuditEntry;
use studyspace_core::billing::Bill;
use studyspace_core::booking::{BookingStatus, SeatBooking};
use studyspace_core::duration::DurationSpec;
use studyspace_core::seat::{CustomPricing, Seat, SeatTier};
use studyspace_core::{BookingStore, BookingTxn, StoreError};

/// Postgres-backed store. Every booking transaction runs SERIALIZABLE so
/// overlapping read/write sets cannot both commit; serialization failures
/// surface as the retryable `StoreError::Serialization`.
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        // 40001 serialization_failure, 40P01 deadlock_detected
        if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
            return StoreError::Serialization;
        }
    }
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        sqlx::query_scalar::<_, DateTime<Utc>>("SELECT now()")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn begin(&self) -> Result<Box<dyn BookingTxn>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        Ok(Box::new(PgBookingTxn { tx }))
    }
}

struct PgBookingTxn {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    tier: String,
    hourly_rate: Option<i64>,
    daily_rate: Option<i64>,
    monthly_rate: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    library_id: String,
    room_id: String,
    seat_id: String,
    student_id: String,
    student_name: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration: serde_json::Value,
    seat_tier: String,
    status: String,
    linked_bill_id: Uuid,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<SeatBooking, StoreError> {
        let duration: DurationSpec = serde_json::from_value(self.duration)
            .map_err(|e| StoreError::Backend(format!("corrupt duration column: {}", e)))?;
        let seat_tier = SeatTier::parse(&self.seat_tier)
            .ok_or_else(|| StoreError::Backend(format!("unknown seat tier {}", self.seat_tier)))?;
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown booking status {}", self.status)))?;
        Ok(SeatBooking {
            id: self.id,
            library_id: self.library_id,
            room_id: self.room_id,
            seat_id: self.seat_id,
            student_id: self.student_id,
            student_name: self.student_name,
            start_time: self.start_time,
            end_time: self.end_time,
            duration,
            seat_tier,
            status,
            linked_bill_id: self.linked_bill_id,
            created_at: self.created_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, library_id, room_id, seat_id, student_id, student_name, \
     start_time, end_time, duration, seat_tier, status, linked_bill_id, created_at";

#[async_trait]
impl BookingTxn for PgBookingTxn {
    async fn seat(
        &mut self,
        library_id: &str,
        room_id: &str,
        seat_id: &str,
    ) -> Result<Option<Seat>, StoreError> {
        let row = sqlx::query_as::<_, SeatRow>(
            "SELECT tier, hourly_rate, daily_rate, monthly_rate
             FROM seats
             WHERE library_id = $1 AND room_id = $2 AND seat_id = $3",
        )
        .bind(library_id)
        .bind(room_id)
        .bind(seat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        let Some(row) = row else { return Ok(None) };

        let tier = SeatTier::parse(&row.tier)
            .ok_or_else(|| StoreError::Backend(format!("unknown seat tier {}", row.tier)))?;
        let overrides = CustomPricing {
            hourly: row.hourly_rate,
            daily: row.daily_rate,
            monthly: row.monthly_rate,
        };
        Ok(Some(Seat {
            library_id: library_id.to_string(),
            room_id: room_id.to_string(),
            seat_id: seat_id.to_string(),
            tier,
            custom_pricing: if overrides.is_empty() {
                None
            } else {
                Some(overrides)
            },
        }))
    }

    async fn student_exists(
        &mut self,
        library_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE library_id = $1 AND student_id = $2)",
        )
        .bind(library_id)
        .bind(student_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx)
    }

    async fn active_seat_bookings_ending_after(
        &mut self,
        library_id: &str,
        room_id: &str,
        seat_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SeatBooking>, StoreError> {
        let sql = format!(
            "SELECT {} FROM seat_bookings
             WHERE library_id = $1 AND room_id = $2 AND seat_id = $3
               AND status = 'active' AND end_time > $4
             ORDER BY start_time",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(library_id)
            .bind(room_id)
            .bind(seat_id)
            .bind(cutoff)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn active_student_bookings_ending_after(
        &mut self,
        library_id: &str,
        student_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SeatBooking>, StoreError> {
        let sql = format!(
            "SELECT {} FROM seat_bookings
             WHERE library_id = $1 AND student_id = $2
               AND status = 'active' AND end_time > $3
             ORDER BY start_time",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(library_id)
            .bind(student_id)
            .bind(cutoff)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn insert_booking(&mut self, booking: &SeatBooking) -> Result<(), StoreError> {
        let duration = serde_json::to_value(&booking.duration)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            "INSERT INTO seat_bookings
                 (id, library_id, room_id, seat_id, student_id, student_name,
                  start_time, end_time, duration, seat_tier, status, linked_bill_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(booking.id)
        .bind(&booking.library_id)
        .bind(&booking.room_id)
        .bind(&booking.seat_id)
        .bind(&booking.student_id)
        .bind(&booking.student_name)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(duration)
        .bind(booking.seat_tier.as_str())
        .bind(booking.status.as_str())
        .bind(booking.linked_bill_id)
        .bind(booking.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn insert_bill(&mut self, bill: &Bill) -> Result<(), StoreError> {
        let line_items = serde_json::to_value(&bill.line_items)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            "INSERT INTO bills
                 (id, library_id, student_id, student_name, booking_id, line_items,
                  subtotal, taxes, total_amount, status, issued_at, due_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(bill.id)
        .bind(&bill.library_id)
        .bind(&bill.student_id)
        .bind(&bill.student_name)
        .bind(bill.booking_id)
        .bind(line_items)
        .bind(bill.subtotal)
        .bind(bill.taxes)
        .bind(bill.total_amount)
        .bind(bill.status.as_str())
        .bind(bill.issued_at)
        .bind(bill.due_date)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO booking_audit (id, library_id, action, booking_id, detail, recorded_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(&entry.library_id)
        .bind(entry.action.as_str())
        .bind(entry.booking_id)
        .bind(&entry.detail)
        .bind(entry.recorded_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn cancel_booking(
        &mut self,
        library_id: &str,
        booking_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE seat_bookings SET status = 'cancelled'
             WHERE library_id = $1 AND id = $2 AND status = 'active'",
        )
        .bind(library_id)
        .bind(booking_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx)
    }
}
