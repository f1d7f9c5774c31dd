// Coin transfers, swaps, staking and balance lookups for a wallet.
//
// Every operation answers with an `Outcome`; chain errors are logged and
// returned as `Failed to <action>: <cause>`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use money_buddy_core::outcome::Outcome;

use crate::account::AccountAddress;
use crate::client::EntryFunction;
use crate::error::ChainError;
use crate::wallet::Wallet;

pub const APTOS_COIN: &str = "0x1::aptos_coin::AptosCoin";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balances {
    /// Coin type to balance in base units.
    pub balances: BTreeMap<String, u64>,
    pub message: String,
}

fn failed<T>(action: &str, e: ChainError) -> Outcome<T> {
    error!("Error {action}: {e}");
    Outcome::failure(format!("Failed to {action}: {e}"))
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// Send `amount` of `coin_type` (APT when `None`) to `to`.
pub async fn send_tokens(
    wallet: &Wallet,
    to: &str,
    amount: u64,
    coin_type: Option<&str>,
) -> Outcome<TxReceipt> {
    match transfer(wallet, to, amount, coin_type.unwrap_or(APTOS_COIN)).await {
        Ok(hash) => Outcome::success(TxReceipt {
            transaction_hash: hash,
            message: format!("Successfully sent {amount} tokens to {to}"),
        }),
        Err(e) => failed("send tokens", e),
    }
}

async fn transfer(
    wallet: &Wallet,
    to: &str,
    amount: u64,
    coin_type: &str,
) -> Result<String, ChainError> {
    let recipient = AccountAddress::from_hex(to)?;
    let call = EntryFunction::new(AccountAddress::ONE, "aptos_account", "transfer_coins")
        .type_args([coin_type])
        .args(vec![json!(recipient.to_hex()), json!(amount.to_string())]);
    let tx = wallet.client().execute(wallet.account(), &call).await?;
    info!(hash = %tx.hash, %recipient, amount, coin_type, "Transfer committed");
    Ok(tx.hash)
}

// ---------------------------------------------------------------------------
// Swaps
// ---------------------------------------------------------------------------

/// Swap through the configured router on the uncorrelated curve.
pub async fn swap_tokens(
    wallet: &Wallet,
    from: &str,
    to: &str,
    amount: u64,
    min_out: u64,
) -> Outcome<TxReceipt> {
    match swap(wallet, from, to, amount, min_out).await {
        Ok(hash) => Outcome::success(TxReceipt {
            transaction_hash: hash,
            message: format!("Successfully swapped {amount} tokens from {from} to {to}"),
        }),
        Err(e) => failed("swap tokens", e),
    }
}

async fn swap(
    wallet: &Wallet,
    from: &str,
    to: &str,
    amount: u64,
    min_out: u64,
) -> Result<String, ChainError> {
    let router = wallet.settings().swap_router;
    let curve = format!("{router}::curves::Uncorrelated");
    let call = EntryFunction::new(router, "scripts_v2", "swap")
        .type_args([from.to_string(), to.to_string(), curve])
        .args(vec![json!(amount.to_string()), json!(min_out.to_string())]);
    let tx = wallet.client().execute(wallet.account(), &call).await?;
    info!(hash = %tx.hash, from, to, amount, "Swap committed");
    Ok(tx.hash)
}

/// Swap, then send the proceeds' coin type to `recipient`. A failed swap is
/// returned as is and nothing is sent. `min_out` bounds the swap exactly as
/// in [`swap_tokens`].
pub async fn swap_and_send(
    wallet: &Wallet,
    from: &str,
    to: &str,
    amount: u64,
    min_out: u64,
    recipient: &str,
) -> Outcome<TxReceipt> {
    let swapped = swap_tokens(wallet, from, to, amount, min_out).await;
    if !swapped.is_success() {
        return swapped;
    }

    let sent = send_tokens(wallet, recipient, amount, Some(to)).await;
    if !sent.is_success() {
        return sent;
    }
    Outcome::success(TxReceipt {
        transaction_hash: sent.data.map(|r| r.transaction_hash).unwrap_or_default(),
        message: format!("Successfully swapped and sent {amount} tokens to {recipient}"),
    })
}

// ---------------------------------------------------------------------------
// Staking
// ---------------------------------------------------------------------------

pub async fn stake_tokens(wallet: &Wallet, amount: u64) -> Outcome<TxReceipt> {
    match stake(wallet, amount).await {
        Ok(hash) => Outcome::success(TxReceipt {
            transaction_hash: hash,
            message: format!("Successfully staked {amount} tokens"),
        }),
        Err(e) => failed("stake tokens", e),
    }
}

async fn stake(wallet: &Wallet, amount: u64) -> Result<String, ChainError> {
    let pool = wallet
        .settings()
        .staking_pool
        .ok_or_else(|| ChainError::Config("no staking pool configured".into()))?;
    let call = EntryFunction::new(AccountAddress::ONE, "delegation_pool", "add_stake")
        .args(vec![json!(pool.to_hex()), json!(amount.to_string())]);
    let tx = wallet.client().execute(wallet.account(), &call).await?;
    info!(hash = %tx.hash, %pool, amount, "Stake committed");
    Ok(tx.hash)
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// Balances of `owner` (the wallet itself when `None`) for each coin type.
/// An empty list means APT only.
pub async fn get_token_balances(
    wallet: &Wallet,
    owner: Option<AccountAddress>,
    coin_types: &[String],
) -> Outcome<Balances> {
    let owner = owner.unwrap_or_else(|| wallet.address());
    let default = [APTOS_COIN.to_string()];
    let coin_types = if coin_types.is_empty() { &default[..] } else { coin_types };

    let mut balances = BTreeMap::new();
    for coin_type in coin_types {
        match coin_balance(wallet, owner, coin_type).await {
            Ok(amount) => {
                balances.insert(coin_type.clone(), amount);
            }
            Err(e) => return failed("get token balances", e),
        }
    }

    Outcome::success(Balances {
        balances,
        message: "Successfully retrieved token balances".to_string(),
    })
}

async fn coin_balance(
    wallet: &Wallet,
    owner: AccountAddress,
    coin_type: &str,
) -> Result<u64, ChainError> {
    let call = EntryFunction::new(AccountAddress::ONE, "coin", "balance")
        .type_args([coin_type])
        .args(vec![json!(owner.to_hex())]);
    let values = wallet.client().view(&call).await?;
    match values.first() {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| ChainError::Decode(format!("balance is not a u64: {s}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| ChainError::Decode(format!("balance is not a u64: {n}"))),
        other => Err(ChainError::Decode(format!("unexpected balance result: {other:?}"))),
    }
}
