//! Core types and trait definitions for the gate logbook.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod device;
pub mod error;
pub mod event;
pub mod identity;
pub mod ingest;
pub mod occupancy;
pub mod query;
pub mod store;
pub mod zone;

pub use error::{Error, Result};
