//! HTTP API for the arrival board.
//!
//! JSON endpoints for merged and scheduled arrivals plus schedule cache
//! maintenance.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
