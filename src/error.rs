//! Error types shared across the engine.
//!
//! Recoverable evaluation outcomes (missing expression, unresolved reference,
//! evaluator rejection) are *not* errors: they travel as a `Status` inside a
//! `StatusValuePair`. Everything in this module is fatal for the caller.
use thiserror::Error;

/// Failure reported by the external formula evaluator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    /// The expression is syntactically or semantically inconsistent with the
    /// supplied values/types. Point evaluation turns this into `Status::Error`.
    #[error("invalid formula input: {0}")]
    InvalidInput(String),
    /// Any other evaluator failure. Never absorbed into a status.
    #[error("formula evaluator failure: {0}")]
    Internal(String),
}

/// Failure reported by a storage-side collaborator (value store, data lookup,
/// location directory, period catalog).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("storage failure: {0}")]
pub struct StoreError(pub String);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("key does not match the reference pattern: '{0}'")]
    InvalidToken(String),
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raised while decoding a serialized value document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("malformed value document: {0}")]
    Malformed(String),
    #[error("value document must be a JSON object")]
    NotAnObject,
    #[error("'{0}' is a reserved key and cannot be used as an attribute")]
    ReservedAttribute(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {msg}")]
    Io { path: String, msg: String },
    #[error("invalid configuration: {0}")]
    Parse(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
