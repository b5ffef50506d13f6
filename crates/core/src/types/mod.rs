//! Core types for Storeloom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credits;
pub mod id;
pub mod price;
pub mod status;

pub use credits::{Credits, CreditsError, DEFAULT_CREDITS, PricedAction};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
