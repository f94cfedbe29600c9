//! `reel-watch` library crate.
//!
//! Re-exports internal modules for testing. The binary entrypoint lives
//! in `main.rs`.

pub mod config;
pub mod report;
