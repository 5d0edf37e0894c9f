//! Shared test utilities for eclfile crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`TestDir`] - Managed temporary directory that knows keyword file names
//! - [`strategies`] - Proptest generators for keywords
//! - [`fixtures`] - Synthetic unified restart files with predictable contents

#![deny(unsafe_code)]

mod test_dir;
pub use test_dir::{CASE, TestDir};

pub mod fixtures;
pub mod strategies;
