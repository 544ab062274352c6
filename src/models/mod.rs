//! Core data models for papers, projects and citation styles.

mod citation;
mod paper;
mod project;

pub use citation::CitationStyle;
pub use paper::{
    normalize_tag, Author, ContainerTitle, DateParts, OneOrMany, PaperBuilder, PaperRecord,
};
pub use project::{Project, ProjectStats};

pub(crate) use project::now_rfc3339;
