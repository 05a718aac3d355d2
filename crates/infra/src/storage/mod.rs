//! Host-side persistence and capability state

pub mod capabilities;
pub mod json_file;

pub use capabilities::CapabilityBoard;
pub use json_file::JsonFileStore;
