//! Error types and handling for the notarization pipeline

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Custom result type for notarization operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for notarization operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input cannot be parsed as a PDF, is encrypted, or has no pages
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// No embedded payload carries the requested name
    #[error("Payload not found: {0}")]
    PayloadNotFound(String),

    #[error("Presentation error: {0}")]
    PresentationError(#[from] PresentationError),

    #[error("Stream filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Issuer error: {0}")]
    Issuer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Helper for wrapping any displayable parse failure as a malformed document
    pub fn malformed<E: std::fmt::Display>(e: E) -> Self {
        Error::MalformedDocument(e.to_string())
    }

    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::MalformedDocument(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

// -------------------- Sub-Error Categories --------------------

/// Invalid embed parameters, always raised before the document is touched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PresentationError {
    #[error("Invalid payment address: {0}")]
    InvalidAddress(String),

    #[error("Invalid notice template: {0}")]
    InvalidTemplate(String),

    #[error("Unknown placeholder in notice template: {0}")]
    UnknownPlaceholder(String),

    #[error("Invalid donation split: {0}")]
    InvalidSplit(String),

    #[error("Payment code generation failed: {0}")]
    CodeGeneration(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterError {
    #[error("Unsupported stream filter: {0}")]
    Unsupported(String),

    #[error("Unsupported predictor {0}")]
    UnsupportedPredictor(i64),

    #[error("Corrupted {filter} data: {reason}")]
    Corrupted { filter: String, reason: String },
}
