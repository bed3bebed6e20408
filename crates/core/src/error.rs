//! Error types for the seagrass twin pipeline
//!
//! Every fallible operation in the core crate returns [`Result`]. Degenerate data
//! (constant fields, empty candidate sets) is not an error: it is carried through
//! as NaN or as the optimizer's sentinel objective values.

use std::path::PathBuf;

/// Result alias used throughout the core crate
pub type Result<T> = std::result::Result<T, TwinError>;

/// Errors raised by the dataset model, the pipeline stages and persistence
#[derive(Debug, thiserror::Error)]
pub enum TwinError {
    /// A stage started without one of its required input fields
    #[error("stage '{stage}' requires field '{field}', which is absent from the dataset")]
    MissingField {
        /// Stage that performed the validation
        stage: &'static str,
        /// Canonical name of the missing field
        field: String,
    },

    /// A field cannot be broadcast onto the dataset's coordinate axes
    #[error("field '{field}' has {got} values, expected {expected} for the dataset axes")]
    ShapeMismatch {
        /// Field being inserted
        field: String,
        /// Number of values implied by the axes
        expected: usize,
        /// Number of values supplied
        got: usize,
    },

    /// A coordinate axis is empty, non-finite or not strictly monotonic
    #[error("invalid axis '{axis}': {reason}")]
    InvalidAxis {
        /// Axis name
        axis: String,
        /// What is wrong with it
        reason: String,
    },

    /// Two source names harmonize onto the same canonical name
    #[error("source names '{first}' and '{second}' both map to '{canonical}'")]
    SchemaConflict {
        /// First source name
        first: String,
        /// Second source name
        second: String,
        /// Canonical name both resolve to
        canonical: String,
    },

    /// A query named a field the dataset does not hold
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// A model was asked to fit on zero usable rows
    #[error("no complete rows available to train the {model} model")]
    EmptyTrainingSet {
        /// Which model was being fitted
        model: &'static str,
    },

    /// A configuration value is out of its admissible range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem failure while persisting or loading artifacts
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse failure
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TwinError {
    /// Wrap an I/O error together with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a missing-field failure at stage start
    pub fn missing(stage: &'static str, field: impl Into<String>) -> Self {
        Self::MissingField {
            stage,
            field: field.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message_names_stage_and_field() {
        let err = TwinError::missing("suitability", "KD490");
        let msg = err.to_string();
        assert!(msg.contains("suitability"));
        assert!(msg.contains("KD490"));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = TwinError::ShapeMismatch {
            field: "depth".into(),
            expected: 100,
            got: 99,
        };
        assert_eq!(
            err.to_string(),
            "field 'depth' has 99 values, expected 100 for the dataset axes"
        );
    }
}
