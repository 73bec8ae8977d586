//! Core types and trait definitions for the HireME deadline monitor.
//!
//! This crate is deliberately free of HTTP, database and runtime
//! dependencies. The storage backend, the notification transports and the
//! scan scheduler all build on the types and traits defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod dedup;
pub mod error;
pub mod graph;
pub mod message;
pub mod record;
pub mod store;
pub mod subscriber;
pub mod transport;
pub mod window;

pub use error::{Error, Result, TransportError};
