//! RTMS Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the RTMS extraction tools.
//!
//! # Overview
//!
//! - **Error Handling**: [`CommonError`] and the crate [`Result`] alias
//! - **Configuration**: JSON configuration documents with environment overrides
//! - **Checksums**: SHA-256 digests for uploaded payloads
//! - **Logging**: `tracing` subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use rtms_common::config::load_json_document;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct ApiDocument {
//!     end_point: String,
//! }
//!
//! fn main() -> rtms_common::Result<()> {
//!     let doc: ApiDocument = load_json_document("env/dev_config.json")?;
//!     println!("endpoint: {}", doc.end_point);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
