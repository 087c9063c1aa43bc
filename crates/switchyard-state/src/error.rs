//! Errors raised while reading or writing deployment state.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state database unavailable: {0}")]
    Unavailable(String),

    #[error("state transaction failed: {0}")]
    Transaction(String),

    #[error("state table unavailable: {0}")]
    Table(String),

    #[error("reading deployment state failed: {0}")]
    Read(String),

    #[error("writing deployment state failed: {0}")]
    Write(String),

    #[error("container snapshot could not be encoded: {0}")]
    Encode(String),

    /// The stored bytes are not a snapshot this version understands.
    #[error("stored container snapshot is unreadable: {0}")]
    CorruptSnapshot(String),
}
