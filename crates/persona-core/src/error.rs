//! Error types for persona-core

use thiserror::Error;

/// Errors that can occur while synthesizing an identity
#[derive(Error, Debug)]
pub enum PersonaError {
    /// The remote service answered with an error envelope
    #[error("API error {code}: {message}")]
    ApiError { code: i64, message: String },

    /// No qualifying name pair was found within the attempt budget
    #[error("refinement exhausted after {attempts} attempts without a qualifying name pair")]
    RefinementExhausted { attempts: u32 },

    /// Photo listing yielded no usable URLs
    #[error("no usable photo URLs for candidate {owner_id}")]
    EmptyCandidateSet { owner_id: i64 },

    /// Every sampled photo transfer failed
    #[error("all {attempted} photo transfers failed for candidate {owner_id}")]
    PhotoTransferFailed { owner_id: i64, attempted: usize },

    /// Names too short to build any username fragment
    #[error("names too short to build usernames: {first:?} / {last:?}")]
    InsufficientNameLength { first: String, last: String },

    /// A write-once identity field was written twice, or read before it was set
    #[error("identity invariant violated: {0}")]
    InvariantViolation(String),

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// A request exceeded its timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<reqwest::Error> for PersonaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PersonaError::Timeout(err.to_string())
        } else {
            PersonaError::Http(err.to_string())
        }
    }
}

impl PersonaError {
    /// Soft failures leave the run able to continue with a partial identity.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            PersonaError::ApiError { .. }
                | PersonaError::EmptyCandidateSet { .. }
                | PersonaError::PhotoTransferFailed { .. }
                | PersonaError::Timeout(_)
                | PersonaError::Http(_)
        )
    }

    /// Terminal failures end the generation run and must reach the caller.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PersonaError::RefinementExhausted { .. })
    }
}

/// Result type for persona-core operations
pub type Result<T> = std::result::Result<T, PersonaError>;
