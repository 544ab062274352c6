//! Scheduling of the per-style citation fetches of one conversion.

use futures_util::stream::{self, StreamExt};
use std::collections::BTreeMap;

use crate::citation::{CitationFormatError, CitationFormatter};
use crate::config::{CitationsConfig, FanOutMode};
use crate::models::CitationStyle;

/// Citations for one DOI, with placeholders where a style failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedCitations {
    pub citations: BTreeMap<CitationStyle, String>,
    /// Styles whose placeholder comes from a service or connection error
    pub transient_failures: usize,
}

impl CollectedCitations {
    fn insert(&mut self, style: CitationStyle, outcome: Result<String, CitationFormatError>) {
        let text = match outcome {
            Ok(text) => text,
            Err(e) => {
                if e.is_transient() {
                    self.transient_failures += 1;
                }
                e.to_string()
            }
        };
        self.citations.insert(style, text);
    }

    /// No placeholder would change on a later fetch
    pub fn is_complete(&self) -> bool {
        self.transient_failures == 0
    }
}

/// How the citation fetches for one DOI are issued.
///
/// Either way the result holds exactly one entry per [`CitationStyle`], and
/// it is only returned once every fetch has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FanOut {
    /// One style after another
    #[default]
    Sequential,
    /// Up to `max_concurrency` fetches in flight at once
    Parallel { max_concurrency: usize },
}

impl FanOut {
    pub fn from_config(config: &CitationsConfig) -> Self {
        match config.fan_out {
            FanOutMode::Sequential => FanOut::Sequential,
            FanOutMode::Parallel => FanOut::Parallel {
                max_concurrency: config.max_concurrency.max(1),
            },
        }
    }

    /// Fetch `doi` in every style
    pub async fn collect(&self, formatter: &CitationFormatter, doi: &str) -> CollectedCitations {
        let mut collected = CollectedCitations::default();
        match *self {
            FanOut::Sequential => {
                for style in CitationStyle::ALL {
                    collected.insert(style, formatter.try_format_style(doi, style).await);
                }
            }
            FanOut::Parallel { max_concurrency } => {
                let outcomes: Vec<_> = stream::iter(CitationStyle::ALL)
                    .map(|style| async move {
                        (style, formatter.try_format_style(doi, style).await)
                    })
                    .buffered(max_concurrency.max(1))
                    .collect()
                    .await;
                for (style, outcome) in outcomes {
                    collected.insert(style, outcome);
                }
            }
        }
        collected
    }
}
