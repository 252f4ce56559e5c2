//! Rail station list.
//!
//! The agency lists one entry per station code, so a transfer complex such
//! as Metro Center appears once per platform level. Entries sharing a name
//! are grouped into one rider-facing station whose [`StationId`] joins the
//! codes, ready to pass to the arrivals endpoints. The list is fetched at
//! startup and refreshed daily.
//!
//! [`StationId`]: crate::domain::StationId

mod client;
mod directory;
mod error;

pub use client::{StationClient, StationClientConfig, StationDto, StationSource, StationsResponse};
pub use directory::{StationDirectory, StationGroup, group_by_name};
pub use error::StationError;
