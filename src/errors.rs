use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cryptography error: {0}")]
    Crypto(String),
    #[error("ledger error: {0}")]
    Ledger(String),
    #[error("wallet error: {0}")]
    Wallet(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Errors surfaced to RPC clients. The `Display` strings are the wire
/// contract: they are emitted verbatim as the `error` field of a response
/// and must stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("Bad account number")]
    BadAccountNumber,
    #[error("Bad wallet number")]
    BadWalletNumber,
    #[error("Bad source number")]
    BadSourceNumber,
    #[error("Bad hash number")]
    BadHashNumber,
    #[error("Invalid block hash")]
    InvalidBlockHash,
    #[error("Invalid count limit")]
    InvalidCountLimit,
    #[error("Invalid starting account")]
    InvalidStartingAccount,
    #[error("Bad amount number")]
    BadAmountNumber,
    #[error("Bad amount format")]
    BadAmountFormat,
    #[error("Bad source account")]
    BadSourceAccount,
    #[error("Bad destination account")]
    BadDestinationAccount,
    #[error("Bad private key")]
    BadPrivateKey,
    #[error("Bad block hash")]
    BadBlockHash,
    #[error("Bad timeout number")]
    BadTimeoutNumber,
    #[error("Bad transaction wallet number")]
    BadTransactionWalletNumber,
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Invalid port")]
    InvalidPort,
    #[error("Invalid account number")]
    InvalidAccountNumber,
    #[error("Wallet not found")]
    WalletNotFound,
    #[error("Source not found")]
    SourceNotFound,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Block not found")]
    BlockNotFound,
    #[error("Wallet is locked")]
    WalletIsLocked,
    #[error("Wallet locked")]
    WalletLocked,
    #[error("Unable to find wallets")]
    UnableToFindWallets,
    #[error("Unable to find wallet")]
    UnableToFindWallet,
    #[error("Account not in wallet")]
    AccountNotInWallet,
    #[error("Account has non-zero balance")]
    AccountHasBalance,
    #[error("Unable to create transaction account")]
    UnableToCreateAccount,
    #[error("Amount too big")]
    AmountTooBig,
    #[error("Cancelled")]
    Cancelled,
    #[error("Block work is invalid")]
    BlockWorkInvalid,
    #[error("Block is invalid")]
    BlockInvalid,
    #[error("RPC control is disabled")]
    ControlDisabled,
    #[error("Unknown command")]
    UnknownCommand,
    #[error("Unable to parse JSON")]
    ParseJson,
    #[error("Internal server error in RPC")]
    Internal,
    #[error("Internal payment error")]
    InternalPayment,
    #[error("Payment already in progress")]
    PaymentInProgress,
    #[error("Can only POST requests")]
    MethodNotPost,
}
