// Aptos integration: accounts and signing, the fullnode REST client, coin
// and Emojicoin operations, and the agent tools built on them.

pub mod account;
pub mod client;
pub mod emojicoin;
pub mod error;
pub mod tokens;
pub mod tools;
pub mod wallet;

pub use account::{AccountAddress, LocalAccount};
pub use client::{AptosRestClient, ChainClient, CommittedTransaction, EntryFunction};
pub use error::ChainError;
pub use wallet::{ChainSettings, Wallet};
