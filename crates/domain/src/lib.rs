//! # GreenWindow Domain
//!
//! Business domain types and models for GreenWindow.
//!
//! This crate contains:
//! - Session, window and forecast data types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants (store keys, capability ids, cadences)
//!
//! ## Architecture
//! - No dependencies on other GreenWindow crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
