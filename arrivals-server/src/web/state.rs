//! Application state for the web layer.

use std::sync::Arc;

use crate::board::ArrivalBoard;
use crate::stations::StationDirectory;

/// Shared application state.
pub struct AppState<S, F, L> {
    /// Board answering every arrivals request
    pub board: Arc<ArrivalBoard<S, F, L>>,
    /// Grouped station list, refreshed in the background
    pub stations: StationDirectory,
}

impl<S, F, L> AppState<S, F, L> {
    /// Create a new app state.
    pub fn new(board: Arc<ArrivalBoard<S, F, L>>, stations: StationDirectory) -> Self {
        Self { board, stations }
    }
}

impl<S, F, L> Clone for AppState<S, F, L> {
    fn clone(&self) -> Self {
        Self {
            board: Arc::clone(&self.board),
            stations: self.stations.clone(),
        }
    }
}
