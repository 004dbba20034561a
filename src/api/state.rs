use std::sync::Arc;

use crate::services::sessions::GiftService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gifts: Arc<GiftService>,
}

impl AppState {
    pub fn new(gifts: Arc<GiftService>) -> Self {
        Self { gifts }
    }
}
