//! Bitcoin raw block decoder and embedded content recovery
//!

pub mod cli;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod extraction;
pub mod fetcher;
pub mod ingest;
pub mod types;

pub use decoder::{decode_block, decode_block_hex, ParsedBlock};
pub use extraction::ExtractedContent;
pub use types::content_detection::{infer_content_type, ContentFormat};
