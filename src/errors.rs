use std::io;

use chrono::NaiveDate;
use thiserror::Error;

use crate::merge::MergeStage;

/// Error type for request validation, retrieval, and merge failures.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("vintage {requested} is outside the archived range (bound {bound})")]
    DateOutOfRange {
        requested: NaiveDate,
        bound: NaiveDate,
    },
    #[error("failed fetching '{resource}': {reason}")]
    Fetch { resource: String, reason: String },
    #[error("member '{member}' not found in archive '{archive}'")]
    NotFound { archive: String, member: String },
    #[error("{stage} merge failed: {source}")]
    MergeSource {
        stage: MergeStage,
        #[source]
        source: Box<PanelError>,
    },
    #[error("provenance unavailable: {0}")]
    Provenance(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PanelError {
    /// Build a fetch error for `resource`.
    pub fn fetch(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Wrap `self` as a failure of merge `stage`.
    pub fn in_stage(self, stage: MergeStage) -> Self {
        Self::MergeSource {
            stage,
            source: Box::new(self),
        }
    }
}
