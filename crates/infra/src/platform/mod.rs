//! Platform services

pub mod clock;

pub use clock::SystemClock;
