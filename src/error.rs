use crate::data::Segment;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

//errors raised by the evaluation engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Incomplete history for {segment}: need {required} days before {as_of}, have {available}")]
    IncompleteHistory {
        segment: Segment,
        as_of: NaiveDate,
        required: i64,
        available: i64,
    },
    #[error("Missing date {date} in series for {segment}")]
    MissingDate { segment: Segment, date: NaiveDate },
    #[error("Invalid series for {segment}: {reason}")]
    InvalidSeries { segment: Segment, reason: String },
    #[error("Insufficient training data for pivot {pivot}: need {required} rows, found {found}")]
    InsufficientTrainingData {
        pivot: NaiveDate,
        required: usize,
        found: usize,
    },
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Undefined metric {metric}: actual total is zero")]
    UndefinedMetric { metric: &'static str },
    #[error("Policy store {path:?} is corrupt: {source}")]
    PolicyStoreCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Model {model} failed: {reason}")]
    ModelFit { model: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    //returns true when the error only invalidates the current cell
    //configuration errors (unknown model key, corrupt store) must abort the run
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::IncompleteHistory { .. }
            | EngineError::MissingDate { .. }
            | EngineError::InvalidSeries { .. }
            | EngineError::InsufficientTrainingData { .. }
            | EngineError::UndefinedMetric { .. }
            | EngineError::ModelFit { .. } => true,
            EngineError::UnknownModel(_)
            | EngineError::PolicyStoreCorrupt { .. }
            | EngineError::Io(_)
            | EngineError::Csv(_)
            | EngineError::Json(_) => false,
        }
    }

    //short machine-friendly label used in skip reports
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::IncompleteHistory { .. } => "IncompleteHistory",
            EngineError::MissingDate { .. } => "MissingDate",
            EngineError::InvalidSeries { .. } => "InvalidSeries",
            EngineError::InsufficientTrainingData { .. } => "InsufficientTrainingData",
            EngineError::UnknownModel(_) => "UnknownModel",
            EngineError::UndefinedMetric { .. } => "UndefinedMetric",
            EngineError::PolicyStoreCorrupt { .. } => "PolicyStoreCorrupt",
            EngineError::ModelFit { .. } => "ModelFit",
            EngineError::Io(_) => "Io",
            EngineError::Csv(_) => "Csv",
            EngineError::Json(_) => "Json",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_fatal() {
        assert!(!EngineError::UnknownModel("XGB".into()).is_recoverable());

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let corrupt = EngineError::PolicyStoreCorrupt {
            path: PathBuf::from("policy.json"),
            source,
        };
        assert!(!corrupt.is_recoverable());
        assert_eq!(corrupt.kind(), "PolicyStoreCorrupt");
    }

    #[test]
    fn test_data_errors_are_recoverable() {
        let err = EngineError::InsufficientTrainingData {
            pivot: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            required: 60,
            found: 12,
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("need 60 rows"));
    }
}
