//! Common utilities for the wallaby HTML parsing library.
//!
//! This crate provides shared infrastructure used by the other wallaby
//! crates:
//! - **Warning System** - deduplicated colored terminal output for
//!   recoverable parse errors and unsupported constructs

pub mod warning;
