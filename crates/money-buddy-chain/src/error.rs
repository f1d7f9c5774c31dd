// Errors raised by the Aptos collaborator before they are flattened into
// `Outcome` failures at the operation boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid account address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("node returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected node response: {0}")]
    Decode(String),

    #[error("transaction {hash} failed: {vm_status}")]
    TransactionFailed { hash: String, vm_status: String },

    #[error("transaction {hash} not confirmed within {secs}s")]
    Timeout { hash: String, secs: u64 },

    #[error("no Emojicoin market exists for {0}")]
    MarketNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}
