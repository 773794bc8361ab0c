pub mod audit;
pub mod billing;
pub mod booking;
pub mod conflict;
pub mod duration;
pub mod error;
pub mod pricing;
pub mod repository;
pub mod seat;

pub use error::{BookingError, BookingResult};
pub use repository::{BookingStore, BookingTxn, StoreError};
