//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and bounding volumes
//! - Monotonic clocks
//! - Logging setup

pub mod math;
pub mod time;
pub mod logging;
