// Emojicoin market operations: swap, provide liquidity, remove liquidity.
//
// Markets are keyed by the concatenated UTF-8 bytes of their emojis. The
// market address is looked up on chain before every call.

use serde_json::{json, Value};
use tracing::{error, info};

use money_buddy_core::outcome::Outcome;

use crate::account::AccountAddress;
use crate::client::EntryFunction;
use crate::error::ChainError;
use crate::tokens::TxReceipt;
use crate::wallet::Wallet;

const MODULE: &str = "emojicoin_dot_fun";

/// Integrator fee in basis points, passed on every swap.
const INTEGRATOR_FEE_RATE_BPS: u8 = 50;

/// Minimum output accepted by swaps and liquidity calls.
const MIN_OUTPUT: &str = "1";

/// Hex-encoded `vector<u8>` argument for an emoji sequence.
pub fn emoji_bytes_arg(emojis: &[String]) -> String {
    format!("0x{}", hex::encode(emojis.concat().as_bytes()))
}

/// Address of the market for `emojis`.
pub async fn market_address(
    wallet: &Wallet,
    emojis: &[String],
) -> Result<AccountAddress, ChainError> {
    let call = EntryFunction::new(
        wallet.settings().emojicoin_module,
        MODULE,
        "market_metadata_by_emoji_bytes",
    )
    .args(vec![json!(emoji_bytes_arg(emojis))]);
    let values = wallet.client().view(&call).await?;
    parse_market_address(&values, &emojis.concat())
}

/// The view returns `[Option<MarketMetadata>]`, encoded as `{"vec": []}` or
/// `{"vec": [{"market_address": …}]}`.
fn parse_market_address(values: &[Value], symbol: &str) -> Result<AccountAddress, ChainError> {
    let entries = values
        .first()
        .and_then(|v| v.get("vec"))
        .and_then(Value::as_array)
        .ok_or_else(|| ChainError::Decode("market metadata is not an option".into()))?;
    let Some(metadata) = entries.first() else {
        return Err(ChainError::MarketNotFound(symbol.to_string()));
    };
    let address = metadata
        .get("market_address")
        .and_then(Value::as_str)
        .ok_or_else(|| ChainError::Decode("market metadata has no market_address".into()))?;
    AccountAddress::from_hex(address)
}

fn market_call(
    wallet: &Wallet,
    market: AccountAddress,
    function: &str,
    args: Vec<Value>,
) -> EntryFunction {
    EntryFunction::new(wallet.settings().emojicoin_module, MODULE, function)
        .type_args([
            format!("{market}::coin_factory::Emojicoin"),
            format!("{market}::coin_factory::EmojicoinLP"),
        ])
        .args(args)
}

async fn run(wallet: &Wallet, call: EntryFunction) -> Result<String, ChainError> {
    let tx = wallet.client().execute(wallet.account(), &call).await?;
    info!(hash = %tx.hash, function = %call.function, "Emojicoin transaction committed");
    Ok(tx.hash)
}

fn finish(action: &str, result: Result<String, ChainError>, message: String) -> Outcome<TxReceipt> {
    match result {
        Ok(hash) => Outcome::success(TxReceipt {
            transaction_hash: hash,
            message,
        }),
        Err(e) => {
            error!("Error trying to {action}: {e}");
            Outcome::failure(format!("Failed to {action}: {e}"))
        }
    }
}

pub async fn swap(
    wallet: &Wallet,
    emojis: &[String],
    amount: u64,
    is_selling: bool,
) -> Outcome<TxReceipt> {
    let result = async {
        let market = market_address(wallet, emojis).await?;
        let args = vec![
            json!(market.to_hex()),
            json!(amount.to_string()),
            json!(is_selling),
            json!(wallet.settings().integrator.to_hex()),
            json!(INTEGRATOR_FEE_RATE_BPS),
            json!(MIN_OUTPUT),
        ];
        run(wallet, market_call(wallet, market, "swap", args)).await
    }
    .await;

    let side = if is_selling { "Sold" } else { "Bought" };
    finish(
        "swap emojicoins",
        result,
        format!("{side} {} with {amount} units", emojis.concat()),
    )
}

pub async fn provide_liquidity(
    wallet: &Wallet,
    emojis: &[String],
    amount: u64,
) -> Outcome<TxReceipt> {
    let result = async {
        let market = market_address(wallet, emojis).await?;
        let args = vec![json!(market.to_hex()), json!(amount.to_string()), json!(MIN_OUTPUT)];
        run(wallet, market_call(wallet, market, "provide_liquidity", args)).await
    }
    .await;

    finish(
        "provide liquidity",
        result,
        format!("Provided {amount} units of liquidity to {}", emojis.concat()),
    )
}

pub async fn remove_liquidity(
    wallet: &Wallet,
    emojis: &[String],
    amount: u64,
) -> Outcome<TxReceipt> {
    let result = async {
        let market = market_address(wallet, emojis).await?;
        let args = vec![json!(market.to_hex()), json!(amount.to_string()), json!(MIN_OUTPUT)];
        run(wallet, market_call(wallet, market, "remove_liquidity", args)).await
    }
    .await;

    finish(
        "remove liquidity",
        result,
        format!("Removed {amount} LP units from {}", emojis.concat()),
    )
}
