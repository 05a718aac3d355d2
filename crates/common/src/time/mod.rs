//! Time utilities
//!
//! - **[`format`]**: local wall-clock formatting and human-readable durations
//! - **[`timer`]**: sleeps that abort on a `CancellationToken`
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "foundation")]
//! # {
//! use chrono::{TimeZone, Utc};
//! use greenwindow_common::time::format_local_time;
//!
//! let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
//! assert_eq!(format_local_time(start, chrono_tz::Europe::Amsterdam), "14:00");
//! # }
//! ```

pub mod format;
#[cfg(feature = "runtime")]
pub mod timer;

pub use format::{format_duration, format_local_time, format_window_range, local_date};
#[cfg(feature = "runtime")]
pub use timer::{sleep_or_cancel, sleep_until_or_cancel, SleepOutcome};
