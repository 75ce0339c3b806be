//! Error types for warden
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API.
//! A policy denial is never an error: it is an `Ok` decision with
//! `allowed == false`.

use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors (settings and policy documents)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contract violations raised while evaluating a request.
///
/// These signal an integration bug in the caller, not a security decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Required request context value '{field}' is missing")]
    MissingContext { field: &'static str },

    #[error("Privilege evaluator is not initialized: roles and roles mapping must be loaded")]
    NotInitialized,
}

/// Cluster topology lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("No such index or alias: {name}")]
    IndexNotFound { name: String },
}

/// Decision service transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Input line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;
