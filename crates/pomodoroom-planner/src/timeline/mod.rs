//! Timeline primitives.
//!
//! This module provides:
//! - The transient [`Interval`] helper type
//! - Free-gap detection between locked intervals

mod gap;

pub use gap::{find_gaps, Interval, TimeGapDetector};
