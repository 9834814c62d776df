use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::{account::AccountError, command::FieldError};

pub mod wallet_processor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("the player {0} was not found")]
    AccountNotFound(String),
    #[error("the currency {0} does not match with the player currency")]
    CurrencyMismatch(String),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

impl WalletError {
    /// Wire code reported in the `error` field. `0` is reserved for success.
    pub fn code(&self) -> u8 {
        match self {
            WalletError::SignatureMismatch => 1,
            WalletError::AccountNotFound(_) => 3,
            WalletError::CurrencyMismatch(_) => 5,
            WalletError::Field(_) | WalletError::Account(_) => 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: u8,
    pub message: String,
}

impl From<&WalletError> for ErrorResponse {
    fn from(err: &WalletError) -> Self {
        Self {
            error: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalanceResponse {
    pub error: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub external_id: String,
    pub session_token: String,
    pub currency: String,
    pub lang: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransactionResponse {
    pub error: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub currency: String,
    /// Fresh for every call; never stored or checked for replays.
    pub transaction_id: String,
}
