use std::io;

use rust_decimal::Decimal;
use thiserror::Error;

use domain::error::DomainError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Insufficient credits: required {needed}, available {available}")]
    InsufficientCredits { available: Decimal, needed: Decimal },

    #[error("Already processed: {message}")]
    AlreadyProcessed { message: String },

    #[error("Inconsistent settlement: {message}")]
    InconsistentSettlement { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("Internal server error")]
    InternalServerError,

    #[error("Service unavailable")]
    ServiceUnavailable,
}

pub type AppResult<T> = Result<T, AppError>;
