//! Core types and trait definitions for Goal Line Report.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the editorial state machine, the role model, comment threading and the
//! storage traits every backend implements.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod comment;
pub mod error;
pub mod feed;
pub mod store;
pub mod story;
pub mod subscription;
pub mod workflow;

pub use error::{Error, Result};
