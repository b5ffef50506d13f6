//! Storeloom Core - Shared domain types.
//!
//! This crate provides the types shared by every Storeloom component:
//! - `storeloom` - Platform library and HTTP API (credits, wizard, generation)
//! - `storeloom-cli` - Operations CLI for migrations and credit administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, credit amounts, the price list, product prices
//!   and shared status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
