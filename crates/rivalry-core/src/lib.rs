//! Core types and services for the rivalry progress tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::RivalStore`]; the [`tracker::Tracker`]
//! drives the completion → streak → achievement chain on top of it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod achievement;
pub mod chat;
pub mod clock;
pub mod compare;
pub mod error;
pub mod item;
pub mod progress;
pub mod store;
pub mod streak;
pub mod tracker;
pub mod user;

pub use error::{Error, Result};
