//! # GreenWindow App
//!
//! Process layer - wiring and lifecycle.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Logging initialisation
//! - Main entry point: pair on first run, then run until Ctrl-C
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod utils;

pub use context::AppContext;
