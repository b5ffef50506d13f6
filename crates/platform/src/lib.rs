//! Storeloom platform library.
//!
//! Credit metering for AI-priced actions, the store generation wizard, and
//! the HTTP API around them. The binary in `main.rs` wires these to
//! `PostgreSQL` and the external services; tests wire them to in-memory
//! fakes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod billing;
pub mod config;
pub mod credits;
pub mod db;
pub mod error;
pub mod feed;
pub mod generation;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod signal;
pub mod state;
pub mod storage;
pub mod wizard;
