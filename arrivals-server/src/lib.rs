//! Metro arrivals server.
//!
//! Answers "what trains arrive at this station soon?" by merging live
//! predictions with arrivals computed from the agency's static schedule,
//! which is downloaded, indexed and cached on disk for a day at a time.

pub mod board;
pub mod cache;
pub mod calendar;
pub mod domain;
pub mod feed;
pub mod index;
pub mod live;
pub mod merge;
pub mod poll;
pub mod query;
pub mod stations;
pub mod web;
