pub mod app_config;
pub mod database;
pub mod memory;
pub mod postgres;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use postgres::PgBookingStore;
