//! # doi-cite
//!
//! Turn DOIs, DOI URLs and publisher links into normalized paper records with
//! citations in 14 styles, and keep them in a local collection.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (PaperRecord, Project, CitationStyle)
//! - [`utils`]: DOI extraction and validation, HTTP client, retry, cache, logging
//! - [`sources`]: Metadata sources (CrossRef, CSL-JSON) and the fallback resolver
//! - [`citation`]: Citation text via DOI content negotiation
//! - [`convert`]: The conversion pipeline and the background batch worker
//! - [`storage`]: Paper and project persistence
//! - [`library`]: Project, tag and search management over a store
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```no_run
//! use doi_cite::{Converter, CitationStyle};
//! use doi_cite::config::get_config;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = Converter::from_config(&get_config()?)?;
//! let record = converter.convert_one("https://doi.org/10.1038/nature12373").await?;
//! println!("{}", record.citation(CitationStyle::Apa).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod citation;
pub mod config;
pub mod convert;
pub mod library;
pub mod models;
pub mod sources;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use citation::CitationFormatter;
pub use convert::{BatchReport, ConversionWorker, ConvertError, Converter};
pub use models::{CitationStyle, PaperRecord, Project};
pub use sources::{MetadataError, MetadataResolver};
pub use storage::{CollectionStore, JsonFileStore, MemoryStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
