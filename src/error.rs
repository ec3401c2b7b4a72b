use thiserror::Error;

use crate::account::RECORD_SIZE;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account already exists: {0}")]
    DuplicateKey(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("No accounts found, create an account first")]
    NoAccounts,
    #[error("Invalid account number or PIN")]
    InvalidCredentials,
    #[error("Account is locked: {account}, retry in {retry_after_secs}s")]
    AccountLocked {
        account: String,
        retry_after_secs: i64,
    },
    #[error("Account store is corrupt: size {size} is not a multiple of {record}", record = RECORD_SIZE)]
    CorruptStore { size: u64 },
    #[error("Account store is corrupt: unreadable record at index {index}")]
    CorruptRecord { index: usize },
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("PIN must be exactly 4 digits")]
    InvalidPin,
    #[error("Invalid account number: {0:?}")]
    InvalidAccountNumber(String),
    #[error("Amount must be positive")]
    NonPositiveAmount,
    #[error("Insufficient funds for withdrawal")]
    InsufficientFunds,
    #[error("Amount would overflow the balance")]
    AmountOverflow,
    #[error("Current PIN does not match")]
    PinMismatch,
}
