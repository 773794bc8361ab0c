use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use studyspace_core::audit::AuditEntry;
use studyspace_core::billing::Bill;
use studyspace_core::booking::{BookingStatus, SeatBooking};
use studyspace_core::seat::Seat;
use studyspace_core::{BookingStore, BookingTxn, StoreError};

/// In-process store with the same optimistic-transaction contract as the
/// Postgres backend. `begin` snapshots the committed state; `commit` fails
/// with `Serialization` if anything else committed in between, and buffered
/// writes are applied only then, so an aborted transaction leaves nothing
/// behind. Used by tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_bill_inserts: AtomicU32,
    fail_cancel_writes: AtomicU32,
    fail_commits: AtomicU32,
}

#[derive(Default, Clone)]
struct MemoryState {
    version: u64,
    seats: HashMap<(String, String, String), Seat>,
    students: HashMap<(String, String), String>,
    bookings: HashMap<Uuid, SeatBooking>,
    bills: HashMap<Uuid, Bill>,
    audit: Vec<AuditEntry>,
}

fn lock(state: &Mutex<MemoryState>) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
    state
        .lock()
        .map_err(|_| StoreError::Backend("memory store mutex poisoned".into()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_seat(&self, seat: Seat) {
        if let Ok(mut state) = self.state.lock() {
            let key = (
                seat.library_id.clone(),
                seat.room_id.clone(),
                seat.seat_id.clone(),
            );
            state.seats.insert(key, seat);
        }
    }

    pub fn seed_student(&self, library_id: &str, student_id: &str, name: &str) {
        if let Ok(mut state) = self.state.lock() {
            state
                .students
                .insert((library_id.into(), student_id.into()), name.into());
        }
    }

    /// Make the next `n` bill inserts fail, for atomicity tests.
    pub fn fail_next_bill_inserts(&self, n: u32) {
        self.fail_bill_inserts.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` cancel writes fail with a serialization conflict,
    /// as a mid-transaction statement clash would under Postgres.
    pub fn fail_next_cancel_writes(&self, n: u32) {
        self.fail_cancel_writes.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` commits fail with a serialization conflict, for
    /// retry-budget tests.
    pub fn fail_next_commits(&self, n: u32) {
        self.fail_commits.store(n, Ordering::SeqCst);
    }

    pub fn booking(&self, id: Uuid) -> Option<SeatBooking> {
        self.state.lock().ok()?.bookings.get(&id).cloned()
    }

    pub fn bill(&self, id: Uuid) -> Option<Bill> {
        self.state.lock().ok()?.bills.get(&id).cloned()
    }

    pub fn booking_count(&self) -> usize {
        self.state.lock().map(|s| s.bookings.len()).unwrap_or(0)
    }

    pub fn bill_count(&self) -> usize {
        self.state.lock().map(|s| s.bills.len()).unwrap_or(0)
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().map(|s| s.audit.clone()).unwrap_or_default()
    }

    fn take_one(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        Ok(Utc::now())
    }

    async fn begin(&self) -> Result<Box<dyn BookingTxn>, StoreError> {
        let snapshot = lock(&self.state)?.clone();
        let base_version = snapshot.version;
        Ok(Box::new(MemoryTxn {
            state: Arc::clone(&self.state),
            snapshot,
            base_version,
            writes: Vec::new(),
            fail_bill_insert: Self::take_one(&self.fail_bill_inserts),
            fail_cancel_write: Self::take_one(&self.fail_cancel_writes),
            fail_commit: Self::take_one(&self.fail_commits),
        }))
    }
}

enum Write {
    Booking(SeatBooking),
    Bill(Bill),
    Audit(AuditEntry),
    Cancel { library_id: String, booking_id: Uuid },
}

struct MemoryTxn {
    state: Arc<Mutex<MemoryState>>,
    snapshot: MemoryState,
    base_version: u64,
    writes: Vec<Write>,
    fail_bill_insert: bool,
    fail_cancel_write: bool,
    fail_commit: bool,
}

#[async_trait]
impl BookingTxn for MemoryTxn {
    async fn seat(
        &mut self,
        library_id: &str,
        room_id: &str,
        seat_id: &str,
    ) -> Result<Option<Seat>, StoreError> {
        let key = (library_id.into(), room_id.into(), seat_id.into());
        Ok(self.snapshot.seats.get(&key).cloned())
    }

    async fn student_exists(
        &mut self,
        library_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError> {
        let key = (library_id.to_string(), student_id.to_string());
        Ok(self.snapshot.students.contains_key(&key))
    }

    async fn active_seat_bookings_ending_after(
        &mut self,
        library_id: &str,
        room_id: &str,
        seat_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SeatBooking>, StoreError> {
        let mut rows: Vec<SeatBooking> = self
            .snapshot
            .bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Active
                    && b.library_id == library_id
                    && b.room_id == room_id
                    && b.seat_id == seat_id
                    && b.end_time > cutoff
            })
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.start_time);
        Ok(rows)
    }

    async fn active_student_bookings_ending_after(
        &mut self,
        library_id: &str,
        student_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SeatBooking>, StoreError> {
        let mut rows: Vec<SeatBooking> = self
            .snapshot
            .bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Active
                    && b.library_id == library_id
                    && b.student_id == student_id
                    && b.end_time > cutoff
            })
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.start_time);
        Ok(rows)
    }

    async fn insert_booking(&mut self, booking: &SeatBooking) -> Result<(), StoreError> {
        self.writes.push(Write::Booking(booking.clone()));
        Ok(())
    }

    async fn insert_bill(&mut self, bill: &Bill) -> Result<(), StoreError> {
        if self.fail_bill_insert {
            return Err(StoreError::Backend("injected bill write failure".into()));
        }
        self.writes.push(Write::Bill(bill.clone()));
        Ok(())
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.writes.push(Write::Audit(entry.clone()));
        Ok(())
    }

    async fn cancel_booking(
        &mut self,
        library_id: &str,
        booking_id: Uuid,
    ) -> Result<bool, StoreError> {
        if self.fail_cancel_write {
            return Err(StoreError::Serialization);
        }
        let retirable = self
            .snapshot
            .bookings
            .get(&booking_id)
            .map(|b| b.library_id == library_id && b.status == BookingStatus::Active)
            .unwrap_or(false);
        if retirable {
            self.writes.push(Write::Cancel {
                library_id: library_id.to_string(),
                booking_id,
            });
        }
        Ok(retirable)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        if this.fail_commit {
            return Err(StoreError::Serialization);
        }
        let mut state = lock(&this.state)?;
        if state.version != this.base_version {
            return Err(StoreError::Serialization);
        }
        for write in this.writes {
            match write {
                Write::Booking(b) => {
                    state.bookings.insert(b.id, b);
                }
                Write::Bill(b) => {
                    state.bills.insert(b.id, b);
                }
                Write::Audit(a) => state.audit.push(a),
                Write::Cancel {
                    library_id,
                    booking_id,
                } => {
                    if let Some(b) = state.bookings.get_mut(&booking_id) {
                        if b.library_id == library_id && b.status == BookingStatus::Active {
                            b.status = BookingStatus::Cancelled;
                        }
                    }
                }
            }
        }
        state.version += 1;
        Ok(())
    }
}
