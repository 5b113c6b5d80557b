use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid credit amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Release of {requested} credits exceeds blocked balance of {blocked}")]
    ReservationExceedsBlocked { requested: Decimal, blocked: Decimal },
}

pub type DomainResult<T> = Result<T, DomainError>;
