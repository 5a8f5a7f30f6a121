//! Content Unit Tests
//!
//! Format detection, payload trimming and per-blob extraction.

pub mod detection;
pub mod extraction;
pub mod trimming;
