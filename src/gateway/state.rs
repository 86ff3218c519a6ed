use std::path::PathBuf;
use std::sync::Arc;

use crate::coordinator::Coordinator;

/// Shared state threaded through every gateway route.
#[derive(Clone)]
pub struct HandlerState {
    pub coordinator: Arc<Coordinator>,
    pub storage_path: PathBuf,
}

impl HandlerState {
    pub fn new(coordinator: Arc<Coordinator>, storage_path: PathBuf) -> Self {
        Self {
            coordinator,
            storage_path,
        }
    }
}
