//! Business logic services.
//!
//! # Services
//!
//! - `assist` - Credit-gated AI assists used while filling in the wizard
//! - `store_generation` - Gated store generation with progress reporting

pub mod assist;
pub mod store_generation;

pub use assist::{AssistError, AssistOutput, AssistRequest, Assistant};
pub use store_generation::{StoreGenerationError, StoreGenerationService};
