//! Static schedule feed: download, decompression and table parsing.

mod client;
mod decode;
mod error;
mod parse;
pub mod records;

pub use client::{FeedClient, FeedClientConfig, FeedSource};
pub use decode::{RowDecoder, RowError, TableReport};
pub use error::FeedError;
pub use parse::{DEFAULT_MAX_DECOMPRESSED_BYTES, ParsedFeed, parse_archive};

#[cfg(test)]
pub(crate) use parse::test_support;
