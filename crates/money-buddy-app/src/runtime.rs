// Shared application state and the per-request wiring of agent and tools.
//
// Long-lived pieces (model client, chain client, Twitter service, data
// sources) are built once at startup. A fresh wallet, tool set and agent are
// built for every request from the caller's private key.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use money_buddy_chain::tools::chain_tools;
use money_buddy_chain::{
    AptosRestClient, ChainClient, ChainError, ChainSettings, LocalAccount, Wallet,
};
use money_buddy_core::config::Config;
use money_buddy_core::tool::ToolRegistry;
use money_buddy_llm::prompt::system_prompt;
use money_buddy_llm::{Agent, ChatModel, LlmClient};
use money_buddy_social::service::TwitterService;
use money_buddy_social::tools::twitter_tools;

use crate::autonomous::{
    AutonomousManager, BalanceSource, PlaceholderBalances, PlaceholderPrices, PlaceholderYields,
    PriceSource, UserPreferences, YieldSource,
};

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn ChatModel>,
    pub chain: Arc<dyn ChainClient>,
    pub chain_settings: ChainSettings,
    pub twitter: Arc<TwitterService>,
    pub max_tokens: u32,
    pub max_tool_rounds: usize,
    pub balances: Arc<dyn BalanceSource>,
    pub prices: Arc<dyn PriceSource>,
    pub yields: Arc<dyn YieldSource>,
}

impl AppState {
    pub fn new(
        model: Arc<dyn ChatModel>,
        chain: Arc<dyn ChainClient>,
        chain_settings: ChainSettings,
        twitter: Arc<TwitterService>,
    ) -> Self {
        Self {
            model,
            chain,
            chain_settings,
            twitter,
            max_tokens: money_buddy_llm::agent::DEFAULT_MAX_TOKENS,
            max_tool_rounds: money_buddy_llm::agent::DEFAULT_MAX_TOOL_ROUNDS,
            balances: Arc::new(PlaceholderBalances),
            prices: Arc::new(PlaceholderPrices),
            yields: Arc::new(PlaceholderYields),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm = LlmClient::from_config(config);
        if llm.is_active() {
            info!(model = %config.llm.model, "LLM client initialized (API key configured)");
        } else {
            info!("LLM client disabled (no API key)");
        }

        let chain = AptosRestClient::from_config(&config.chain);
        info!(node = chain.base_url(), network = ?config.chain.network, "Aptos client ready");

        let settings =
            ChainSettings::from_config(&config.chain).context("invalid chain addresses in config")?;

        let mut state = Self::new(
            Arc::new(llm),
            Arc::new(chain),
            settings,
            Arc::new(TwitterService::from_config(config)),
        );
        state.max_tokens = config.llm.max_tokens;
        state.max_tool_rounds = config.llm.max_tool_rounds;
        Ok(state)
    }

    /// Every tool, acting for `account`.
    pub fn tools_for(&self, account: LocalAccount) -> ToolRegistry {
        let wallet = Wallet::new(account, self.chain.clone(), self.chain_settings.clone());
        let mut registry = ToolRegistry::new();
        registry.extend(chain_tools(wallet));
        registry.extend(twitter_tools(self.twitter.clone()));
        registry
    }

    /// A fresh agent for one request. The displayed wallet address defaults
    /// to the one derived from the key.
    pub fn agent_for(
        &self,
        private_key: &str,
        wallet_address: Option<&str>,
    ) -> Result<Agent, ChainError> {
        let account = LocalAccount::from_private_key(private_key)?;
        let address = match wallet_address {
            Some(addr) if !addr.trim().is_empty() => addr.trim().to_string(),
            _ => account.address().to_hex(),
        };
        let tools = self.tools_for(account);
        Ok(Agent::new(self.model.clone(), tools, system_prompt(&address))
            .with_limits(self.max_tokens, self.max_tool_rounds))
    }

    pub fn autonomous_manager(&self, preferences: Option<UserPreferences>) -> AutonomousManager {
        let mut manager =
            AutonomousManager::new(self.balances.clone(), self.prices.clone(), self.yields.clone());
        if let Some(preferences) = preferences {
            manager.set_user_preferences(preferences);
        }
        manager
    }
}
