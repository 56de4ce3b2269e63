use std::path::PathBuf;

use thiserror::Error;

/// A string that is not part of a closed value set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Fatal problems found while reading or validating a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unable to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse model file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unable to parse model: {0}")]
    ParseText(#[from] serde_yaml::Error),

    #[error("invalid include pattern '{pattern}': {source}")]
    IncludePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("include pattern '{pattern}' does not match any file")]
    IncludeNotFound { pattern: String },

    #[error("model file included more than once: {}", path.display())]
    IncludeCycle { path: PathBuf },

    #[error("duplicate title in included model {}: {title}", path.display())]
    DuplicateIncludedTitle { path: PathBuf, title: String },

    #[error("unknown '{field}' value of {element}: {value}")]
    UnknownValue {
        field: &'static str,
        element: String,
        value: String,
    },

    #[error("invalid id syntax used (only letters, numbers, and hyphen allowed): {0}")]
    InvalidId(String),

    #[error("duplicate id used: {0}")]
    DuplicateId(String),

    #[error("missing referenced {kind} at {location}: {id}")]
    MissingReference {
        kind: &'static str,
        location: String,
        id: String,
    },

    #[error("referenced technical asset {asset} at trust boundary '{boundary}' is modeled in multiple trust boundaries")]
    MultipleTrustBoundaries { asset: String, boundary: String },

    #[error("unable to parse 'date' value of model file: {0}")]
    InvalidDate(String),

    #[error("unable to parse 'date' of risk tracking '{id}': {value}")]
    InvalidTrackingDate { id: String, value: String },
}

impl ModelError {
    pub(crate) fn unknown(field: &'static str, element: impl Into<String>, value: &str) -> Self {
        ModelError::UnknownValue {
            field,
            element: element.into(),
            value: value.to_string(),
        }
    }

    pub(crate) fn missing(kind: &'static str, location: impl Into<String>, id: &str) -> Self {
        ModelError::MissingReference {
            kind,
            location: location.into(),
            id: id.to_string(),
        }
    }
}

/// Failures while registering or running risk rules.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("risk '{synthetic_id}' reports category '{found}' instead of '{expected}'")]
    ForeignCategory {
        synthetic_id: String,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    External(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("duplicate risk category id: {0}")]
    DuplicateCategory(String),

    #[error("risk rule '{rule}' failed: {source}")]
    Rule {
        rule: String,
        #[source]
        source: RuleError,
    },
}

/// Orphaned or malformed risk tracking entries.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("wildcard risk tracking does not match any risk id: {0}")]
    OrphanedWildcard(String),

    #[error("risk tracking references unknown risk (risk id not found), consider ignoring orphaned risk tracking: {0}")]
    OrphanedTracking(String),

    #[error("invalid wildcard risk tracking pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Everything that can abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),
}
