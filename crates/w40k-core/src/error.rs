//! Error taxonomy for the engine, matching the four classes from the design
//! notes: configuration, illegal action, state corruption, opponent failure.
//!
//! Illegal actions are *not* represented here — they are a normal `step`
//! outcome (`success: false`), never a `Result::Err`. `EngineError` is only
//! for conditions the engine refuses to proceed past.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("state corruption: {0}")]
    Corruption(String),

    #[error("opponent failure: {0}")]
    Opponent(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
