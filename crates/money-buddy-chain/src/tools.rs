// Agent tools for Aptos and Emojicoin. Each takes a JSON object as its one
// string argument and answers in plain text.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use money_buddy_core::outcome::Outcome;
use money_buddy_core::tool::Tool;

use crate::account::AccountAddress;
use crate::emojicoin;
use crate::tokens::{self, TxReceipt};
use crate::wallet::Wallet;

/// All chain tools acting for one wallet.
pub fn chain_tools(wallet: Wallet) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(TransferTool(wallet.clone())),
        Arc::new(BalanceTool(wallet.clone())),
        Arc::new(SwapTool(wallet.clone())),
        Arc::new(StakeTool(wallet.clone())),
        Arc::new(EmojicoinSwapTool(wallet.clone())),
        Arc::new(ProvideLiquidityTool(wallet.clone())),
        Arc::new(RemoveLiquidityTool(wallet)),
    ]
}

fn parse_input<T: DeserializeOwned>(input: &str) -> Result<T, String> {
    let input = input.trim();
    let input = if input.is_empty() { "{}" } else { input };
    serde_json::from_str(input).map_err(|e| format!("Invalid input: {e}"))
}

fn describe(outcome: Outcome<TxReceipt>) -> String {
    match outcome.data {
        Some(receipt) => format!(
            "{}. Transaction hash: {}",
            receipt.message, receipt.transaction_hash
        ),
        None => outcome.error.unwrap_or_else(|| "Unknown error".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferInput {
    to: String,
    amount: u64,
    #[serde(default)]
    coin_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceInput {
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    coin_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapInput {
    from: String,
    to: String,
    amount: u64,
    #[serde(default)]
    min_out: u64,
    /// Send the swapped coins here instead of keeping them.
    #[serde(default)]
    recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StakeInput {
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmojicoinSwapInput {
    emojis: Vec<String>,
    amount: u64,
    #[serde(default)]
    is_selling: bool,
}

#[derive(Debug, Deserialize)]
struct LiquidityInput {
    emojis: Vec<String>,
    amount: u64,
}

// ---------------------------------------------------------------------------
// Aptos tools
// ---------------------------------------------------------------------------

pub struct TransferTool(Wallet);

#[async_trait]
impl Tool for TransferTool {
    fn name(&self) -> &'static str {
        "aptos_transfer_token"
    }

    fn description(&self) -> &'static str {
        "Transfer coins to another Aptos account.\n\
         Input is a JSON object: {\"to\": \"0x…\", \"amount\": 100000000, \"coinType\": \"0x1::aptos_coin::AptosCoin\"}. \
         amount is in base units (1 APT = 100000000). coinType defaults to APT."
    }

    async fn call(&self, input: &str) -> String {
        let args: TransferInput = match parse_input(input) {
            Ok(args) => args,
            Err(e) => return e,
        };
        let coin_type = args.coin_type.as_deref();
        describe(tokens::send_tokens(&self.0, &args.to, args.amount, coin_type).await)
    }
}

pub struct BalanceTool(Wallet);

#[async_trait]
impl Tool for BalanceTool {
    fn name(&self) -> &'static str {
        "aptos_get_balance"
    }

    fn description(&self) -> &'static str {
        "Get coin balances in base units.\n\
         Input is a JSON object: {\"owner\": \"0x…\", \"coinTypes\": [\"0x1::aptos_coin::AptosCoin\"]}. \
         Both fields are optional; the default is the user's own APT balance."
    }

    async fn call(&self, input: &str) -> String {
        let args: BalanceInput = match parse_input(input) {
            Ok(args) => args,
            Err(e) => return e,
        };
        let owner = match args.owner.as_deref().map(AccountAddress::from_hex).transpose() {
            Ok(owner) => owner,
            Err(e) => return format!("Invalid input: {e}"),
        };

        let outcome = tokens::get_token_balances(&self.0, owner, &args.coin_types).await;
        match outcome.data {
            Some(found) => {
                let lines: Vec<String> = found
                    .balances
                    .iter()
                    .map(|(coin, amount)| format!("- {coin}: {amount}"))
                    .collect();
                format!("Balances:\n{}", lines.join("\n"))
            }
            None => outcome.error.unwrap_or_else(|| "Unknown error".to_string()),
        }
    }
}

pub struct SwapTool(Wallet);

#[async_trait]
impl Tool for SwapTool {
    fn name(&self) -> &'static str {
        "aptos_swap_token"
    }

    fn description(&self) -> &'static str {
        "Swap one coin type for another on the Liquidswap DEX.\n\
         Input is a JSON object: {\"from\": \"0x1::aptos_coin::AptosCoin\", \"to\": \"<coin type>\", \
         \"amount\": 1000000, \"minOut\": 0, \"recipient\": \"0x…\"}. \
         minOut and recipient are optional; with a recipient the swapped coins are sent there."
    }

    async fn call(&self, input: &str) -> String {
        let args: SwapInput = match parse_input(input) {
            Ok(args) => args,
            Err(e) => return e,
        };
        let outcome = match &args.recipient {
            Some(recipient) => {
                tokens::swap_and_send(
                    &self.0,
                    &args.from,
                    &args.to,
                    args.amount,
                    args.min_out,
                    recipient,
                )
                .await
            }
            None => {
                tokens::swap_tokens(&self.0, &args.from, &args.to, args.amount, args.min_out)
                    .await
            }
        };
        describe(outcome)
    }
}

pub struct StakeTool(Wallet);

#[async_trait]
impl Tool for StakeTool {
    fn name(&self) -> &'static str {
        "aptos_stake_token"
    }

    fn description(&self) -> &'static str {
        "Stake APT with the configured delegation pool.\n\
         Input is a JSON object: {\"amount\": 1100000000} in base units."
    }

    async fn call(&self, input: &str) -> String {
        match parse_input::<StakeInput>(input) {
            Ok(args) => describe(tokens::stake_tokens(&self.0, args.amount).await),
            Err(e) => e,
        }
    }
}

// ---------------------------------------------------------------------------
// Emojicoin tools
// ---------------------------------------------------------------------------

pub struct EmojicoinSwapTool(Wallet);

#[async_trait]
impl Tool for EmojicoinSwapTool {
    fn name(&self) -> &'static str {
        "emojicoin_swap"
    }

    fn description(&self) -> &'static str {
        "Buy or sell an Emojicoin.\n\
         Input is a JSON object: {\"emojis\": [\"🚀\", \"🌕\"], \"amount\": 100000, \"isSelling\": false}. \
         emojis identifies the market; isSelling defaults to false (buy)."
    }

    async fn call(&self, input: &str) -> String {
        match parse_input::<EmojicoinSwapInput>(input) {
            Ok(args) => {
                describe(emojicoin::swap(&self.0, &args.emojis, args.amount, args.is_selling).await)
            }
            Err(e) => e,
        }
    }
}

pub struct ProvideLiquidityTool(Wallet);

#[async_trait]
impl Tool for ProvideLiquidityTool {
    fn name(&self) -> &'static str {
        "emojicoin_provide_liquidity"
    }

    fn description(&self) -> &'static str {
        "Provide APT liquidity to an Emojicoin market.\n\
         Input is a JSON object: {\"emojis\": [\"🚀\"], \"amount\": 100000}."
    }

    async fn call(&self, input: &str) -> String {
        match parse_input::<LiquidityInput>(input) {
            Ok(args) => {
                describe(emojicoin::provide_liquidity(&self.0, &args.emojis, args.amount).await)
            }
            Err(e) => e,
        }
    }
}

pub struct RemoveLiquidityTool(Wallet);

#[async_trait]
impl Tool for RemoveLiquidityTool {
    fn name(&self) -> &'static str {
        "emojicoin_remove_liquidity"
    }

    fn description(&self) -> &'static str {
        "Withdraw liquidity from an Emojicoin market by burning LP coins.\n\
         Input is a JSON object: {\"emojis\": [\"🚀\"], \"amount\": 100000} where amount is LP units."
    }

    async fn call(&self, input: &str) -> String {
        match parse_input::<LiquidityInput>(input) {
            Ok(args) => {
                describe(emojicoin::remove_liquidity(&self.0, &args.emojis, args.amount).await)
            }
            Err(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_an_empty_object() {
        let args: BalanceInput = parse_input("  ").unwrap();
        assert!(args.owner.is_none());
        assert!(args.coin_types.is_empty());
    }

    #[test]
    fn bad_input_is_reported() {
        let err = parse_input::<StakeInput>("stake 5 APT").unwrap_err();
        assert!(err.starts_with("Invalid input: "));
        let err = parse_input::<StakeInput>("{}").unwrap_err();
        assert!(err.contains("amount"));
    }

    #[test]
    fn camel_case_fields() {
        let args: EmojicoinSwapInput =
            parse_input(r#"{"emojis":["🚀"],"amount":5,"isSelling":true}"#).unwrap();
        assert!(args.is_selling);
        let args: SwapInput =
            parse_input(r#"{"from":"a","to":"b","amount":1,"minOut":2}"#).unwrap();
        assert_eq!(args.min_out, 2);
        assert!(args.recipient.is_none());
    }

    #[test]
    fn describe_formats_both_branches() {
        let ok = Outcome::success(TxReceipt {
            transaction_hash: "0xabc".into(),
            message: "Successfully staked 5 tokens".into(),
        });
        assert_eq!(describe(ok), "Successfully staked 5 tokens. Transaction hash: 0xabc");
        assert_eq!(
            describe(Outcome::failure("Failed to stake tokens: boom")),
            "Failed to stake tokens: boom"
        );
    }
}
