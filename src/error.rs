use std::{error::Error, fmt::Debug};

use crate::constants::{BAD_REQUEST, CONFLICT, INTERNAL_ERROR, NOT_FOUND};

#[derive(thiserror::Error)]
pub enum CustomError {
    #[error("ENV '{0}' Not Found")]
    EnvError(String, #[source] std::env::VarError),

    #[error("ENV '{0}' has an invalid value")]
    EnvParseError(String),

    #[error("{0}")]
    Validation(String),

    #[error("User not found")]
    AccountNotFound,

    #[error("Operation denied. Insufficient balance.")]
    InsufficientBalance,

    #[error("Operation denied. Balance limit exceeded.")]
    BalanceOverflow,

    #[error("Account store unavailable")]
    StoreUnavailable,

    #[error("Serialization")]
    Serialization(#[source] serde_json::Error),

    #[error("Database query")]
    DBError(#[source] sqlx::Error),
}

impl CustomError {
    pub fn status_line(&self) -> &'static str {
        match self {
            CustomError::Validation(_) => BAD_REQUEST,
            CustomError::AccountNotFound => NOT_FOUND,
            CustomError::InsufficientBalance | CustomError::BalanceOverflow => CONFLICT,
            _ => INTERNAL_ERROR,
        }
    }

    /// Message safe to hand back to a client.
    pub fn public_message(&self) -> String {
        match self {
            CustomError::Validation(_)
            | CustomError::AccountNotFound
            | CustomError::InsufficientBalance
            | CustomError::BalanceOverflow => self.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<sqlx::Error> for CustomError {
    fn from(e: sqlx::Error) -> Self {
        CustomError::DBError(e)
    }
}

impl Debug for CustomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        if let Some(source) = self.source() {
            write!(f, " (Caused by: {})", source)?;
        }
        Ok(())
    }
}
