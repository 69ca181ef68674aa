//! Clock sources and display formatting helpers.

pub mod clock;
pub mod format;

pub use clock::{Clock, ManualClock, SystemClock};
pub use format::{format_remaining, format_timestamp, truncate_string};
