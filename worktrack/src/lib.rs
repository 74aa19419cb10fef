//! Worktrack - per-user work session tracking.
//!
//! A user starts a timed task on their card, describes it, and completes it;
//! the work service records the session and answers history queries over
//! daily, weekly, monthly and custom windows.
//!
//! Architecture:
//! - The remote work service is the source of truth for ids and timestamps
//! - `engine` holds the per-card state machine and the board controller
//! - `history` fetches and annotates history windows
//! - Elapsed time is always derived from timestamps, never from a tick count
//! - `server` is a reference implementation of the work service

pub mod cache;
pub mod cli;
pub mod client;
pub mod clock;
pub mod config;
pub mod elapsed;
pub mod engine;
pub mod error;
pub mod history;
pub mod models;
pub mod notify;
pub mod server;
pub mod timer;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
