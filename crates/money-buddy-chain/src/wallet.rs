// A signer bound to a chain client and the on-chain addresses the operations
// call into. One `Wallet` is built per request from the caller's key.

use std::sync::Arc;

use money_buddy_core::config::ChainConfig;

use crate::account::{AccountAddress, LocalAccount};
use crate::client::ChainClient;
use crate::error::ChainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSettings {
    pub emojicoin_module: AccountAddress,
    pub integrator: AccountAddress,
    pub swap_router: AccountAddress,
    pub staking_pool: Option<AccountAddress>,
}

impl ChainSettings {
    pub fn from_config(config: &ChainConfig) -> Result<Self, ChainError> {
        let staking_pool = match config.staking_pool.as_deref() {
            Some(pool) if !pool.trim().is_empty() => Some(AccountAddress::from_hex(pool)?),
            _ => None,
        };
        Ok(Self {
            emojicoin_module: AccountAddress::from_hex(&config.emojicoin_module)?,
            integrator: AccountAddress::from_hex(&config.integrator_address)?,
            swap_router: AccountAddress::from_hex(&config.swap_router)?,
            staking_pool,
        })
    }
}

#[derive(Clone)]
pub struct Wallet {
    account: Arc<LocalAccount>,
    client: Arc<dyn ChainClient>,
    settings: Arc<ChainSettings>,
}

impl Wallet {
    pub fn new(
        account: LocalAccount,
        client: Arc<dyn ChainClient>,
        settings: ChainSettings,
    ) -> Self {
        Self {
            account: Arc::new(account),
            client,
            settings: Arc::new(settings),
        }
    }

    pub fn account(&self) -> &LocalAccount {
        &self.account
    }

    pub fn address(&self) -> AccountAddress {
        self.account.address()
    }

    pub fn client(&self) -> &dyn ChainClient {
        self.client.as_ref()
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("settings", &self.settings)
            .finish()
    }
}
