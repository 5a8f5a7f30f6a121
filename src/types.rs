//! Content typing and statistics
//!
//! - `content_detection`: closed format enumeration and the detector chain
//! - `trimming`: leading/trailing cleanup of recovered payloads
//! - `statistics`: ingest counters and snapshots

pub mod content_detection;
pub mod statistics;
pub mod trimming;

pub use content_detection::{infer_content_type, ContentFormat, ImageFormat, TextFormat};
pub use statistics::{IngestSnapshot, IngestStats, StatsHandle};
