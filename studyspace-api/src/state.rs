use std::sync::Arc;

use studyspace_engine::BookingEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
}
