// Autonomous portfolio operations: allocation analysis, yield discovery and
// trading-strategy execution.
//
// Balances, prices and yields come from pluggable sources. The shipped
// sources are fixed placeholder tables, and trading strategies are simulated:
// nothing is signed or submitted, and no transaction hash is reported.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStrategy {
    /// Token symbol to target percentage (0-100).
    pub target_allocations: BTreeMap<String, f64>,
    /// Percentage-point drift that triggers a recommendation.
    pub rebalance_threshold: f64,
    pub risk_tolerance: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldStrategy {
    pub min_yield_threshold: f64,
    pub max_exposure_per_protocol: f64,
    /// Empty means any protocol.
    #[serde(default)]
    pub preferred_protocols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingStrategy {
    /// `dca`, `limit` or `stop-loss`. Anything else is rejected at execution.
    pub trading_type: String,
    pub target_token: String,
    pub source_token: String,
    pub amount: f64,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub target_price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notify_on_rebalance: bool,
    #[serde(default)]
    pub notify_on_trade: bool,
    #[serde(default)]
    pub notify_on_yield_change: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub portfolio_strategy: Option<PortfolioStrategy>,
    #[serde(default)]
    pub yield_strategy: Option<YieldStrategy>,
    #[serde(default)]
    pub trading_strategies: Vec<TradingStrategy>,
    #[serde(default)]
    pub notification_settings: NotificationSettings,
}

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub amount: f64,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldOpportunity {
    pub protocol: String,
    pub token: String,
    pub apy: f64,
    pub risk: RiskLevel,
}

#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balances(&self, wallet_address: &str) -> anyhow::Result<Vec<TokenBalance>>;
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, symbol: &str) -> anyhow::Result<f64>;
}

#[async_trait]
pub trait YieldSource: Send + Sync {
    async fn opportunities(&self) -> anyhow::Result<Vec<YieldOpportunity>>;
}

/// APT 10, USDC 100, USDT 50 for every wallet.
pub struct PlaceholderBalances;

#[async_trait]
impl BalanceSource for PlaceholderBalances {
    async fn balances(&self, wallet_address: &str) -> anyhow::Result<Vec<TokenBalance>> {
        debug!(wallet_address, "Using placeholder balances");
        Ok(vec![
            TokenBalance {
                symbol: "APT".into(),
                amount: 10.0,
                decimals: 8,
            },
            TokenBalance {
                symbol: "USDC".into(),
                amount: 100.0,
                decimals: 6,
            },
            TokenBalance {
                symbol: "USDT".into(),
                amount: 50.0,
                decimals: 6,
            },
        ])
    }
}

/// Every token is worth 1.0.
pub struct PlaceholderPrices;

#[async_trait]
impl PriceSource for PlaceholderPrices {
    async fn price(&self, _symbol: &str) -> anyhow::Result<f64> {
        Ok(1.0)
    }
}

pub struct PlaceholderYields;

#[async_trait]
impl YieldSource for PlaceholderYields {
    async fn opportunities(&self) -> anyhow::Result<Vec<YieldOpportunity>> {
        let row = |protocol: &str, token: &str, apy: f64, risk: RiskLevel| YieldOpportunity {
            protocol: protocol.into(),
            token: token.into(),
            apy,
            risk,
        };
        Ok(vec![
            row("Joule", "APT", 5.2, RiskLevel::Low),
            row("Amnis", "APT", 7.5, RiskLevel::Medium),
            row("Thala", "APT", 8.1, RiskLevel::Medium),
            row("Echelon", "USDC", 4.8, RiskLevel::Low),
            row("Aries", "USDC", 6.2, RiskLevel::Medium),
        ])
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAnalysis {
    /// Token symbol to percentage of total value.
    pub current_allocation: BTreeMap<String, f64>,
    pub recommended_actions: Vec<String>,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldReport {
    pub opportunities: Vec<YieldOpportunity>,
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,
}

impl TradeResult {
    fn simulated(message: String) -> Self {
        Self {
            success: true,
            message,
            simulated: true,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            simulated: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AutonomousManager
// ---------------------------------------------------------------------------

pub struct AutonomousManager {
    balances: Arc<dyn BalanceSource>,
    prices: Arc<dyn PriceSource>,
    yields: Arc<dyn YieldSource>,
    preferences: Option<UserPreferences>,
}

impl Default for AutonomousManager {
    fn default() -> Self {
        Self::new(
            Arc::new(PlaceholderBalances),
            Arc::new(PlaceholderPrices),
            Arc::new(PlaceholderYields),
        )
    }
}

impl AutonomousManager {
    pub fn new(
        balances: Arc<dyn BalanceSource>,
        prices: Arc<dyn PriceSource>,
        yields: Arc<dyn YieldSource>,
    ) -> Self {
        Self {
            balances,
            prices,
            yields,
            preferences: None,
        }
    }

    pub fn set_user_preferences(&mut self, preferences: UserPreferences) {
        self.preferences = Some(preferences);
    }

    pub fn user_preferences(&self) -> Option<&UserPreferences> {
        self.preferences.as_ref()
    }

    /// Current allocation by value, plus a recommendation for every target
    /// token that has drifted past the rebalance threshold.
    pub async fn analyze_portfolio(
        &self,
        wallet_address: &str,
    ) -> anyhow::Result<PortfolioAnalysis> {
        self.portfolio(wallet_address).await.map_err(|e| {
            error!("Error analyzing portfolio: {e:#}");
            e.context("Failed to analyze portfolio")
        })
    }

    async fn portfolio(&self, wallet_address: &str) -> anyhow::Result<PortfolioAnalysis> {
        let balances = self
            .balances
            .balances(wallet_address)
            .await
            .context("Failed to get token balances")?;

        let mut values = Vec::with_capacity(balances.len());
        for balance in &balances {
            let price = self.prices.price(&balance.symbol).await?;
            values.push((balance.symbol.clone(), balance.amount * price));
        }
        let total_value: f64 = values.iter().map(|(_, v)| v).sum();

        let current_allocation: BTreeMap<String, f64> = values
            .into_iter()
            .map(|(symbol, value)| {
                let pct = if total_value > 0.0 {
                    value / total_value * 100.0
                } else {
                    0.0
                };
                (symbol, pct)
            })
            .collect();

        let mut recommended_actions = Vec::new();
        let portfolio_strategy = self
            .preferences
            .as_ref()
            .and_then(|p| p.portfolio_strategy.as_ref());
        if let Some(strategy) = portfolio_strategy {
            for (token, &target) in &strategy.target_allocations {
                let current = current_allocation.get(token).copied().unwrap_or(0.0);
                if (current - target).abs() > strategy.rebalance_threshold {
                    recommended_actions.push(if current < target {
                        format!("Buy more {token} to reach target allocation of {target}%")
                    } else {
                        format!("Reduce {token} to reach target allocation of {target}%")
                    });
                }
            }
        }

        Ok(PortfolioAnalysis {
            current_allocation,
            recommended_actions,
            total_value,
        })
    }

    /// The yield table, filtered and ranked by the yield strategy when one is set.
    pub async fn find_best_yield_opportunities(&self) -> anyhow::Result<YieldReport> {
        let all = self.yields.opportunities().await.map_err(|e| {
            error!("Error finding yield opportunities: {e:#}");
            e.context("Failed to find yield opportunities")
        })?;

        let yield_strategy = self.preferences.as_ref().and_then(|p| p.yield_strategy.as_ref());
        let Some(strategy) = yield_strategy else {
            return Ok(YieldReport {
                opportunities: all,
                recommended_actions: Vec::new(),
            });
        };

        let mut opportunities: Vec<YieldOpportunity> = all
            .into_iter()
            .filter(|o| {
                o.apy >= strategy.min_yield_threshold
                    && (strategy.preferred_protocols.is_empty()
                        || strategy.preferred_protocols.contains(&o.protocol))
            })
            .collect();
        opportunities.sort_by(|a, b| b.apy.total_cmp(&a.apy));

        let mut recommended_actions = Vec::new();
        if let Some(top) = opportunities.first() {
            recommended_actions.push(format!(
                "Consider depositing funds in {} for {} at {}% APY",
                top.protocol, top.token, top.apy
            ));
            if let Some(second) = opportunities.get(1) {
                recommended_actions.push(format!(
                    "For diversification, also consider {} for {} at {}% APY",
                    second.protocol, second.token, second.apy
                ));
            }
            recommended_actions.push(format!(
                "Keep no more than {}% of your portfolio in any single protocol",
                strategy.max_exposure_per_protocol
            ));
        }

        Ok(YieldReport {
            opportunities,
            recommended_actions,
        })
    }

    pub fn execute_trading_strategy(&self, strategy: &TradingStrategy) -> TradeResult {
        let TradingStrategy {
            amount,
            target_token,
            source_token,
            ..
        } = strategy;

        match strategy.trading_type.as_str() {
            "dca" => TradeResult::simulated(format!(
                "Executed DCA: Bought {amount} {target_token} with {source_token}"
            )),
            "limit" => match strategy.target_price {
                Some(price) => TradeResult::simulated(format!(
                    "Set limit order: Buy {amount} {target_token} \
                     when price reaches {price} {source_token}"
                )),
                None => TradeResult::rejected("Target price is required for limit orders"),
            },
            "stop-loss" => match strategy.target_price {
                Some(price) => TradeResult::simulated(format!(
                    "Set stop-loss: Sell {amount} {source_token} \
                     when price drops to {price} {target_token}"
                )),
                None => TradeResult::rejected("Target price is required for stop-loss orders"),
            },
            _ => TradeResult::rejected("Unknown trading strategy type"),
        }
    }
}
