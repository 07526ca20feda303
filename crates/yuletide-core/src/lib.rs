//! Core types and trait definitions for the Yuletide event sites.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the domain records, the submission guard, content validation, the ranking
//! math for bell strikes, and the store traits that backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod bell;
pub mod content;
pub mod error;
pub mod guard;
pub mod ranking;
pub mod store;
pub mod wall;

pub use error::{Error, Result};
