use crate::GenesisConfig;
use flow_harness_primitives::{Chain, DEFAULT_GAS_LIMIT, UFix64};
use flow_harness_wallets::{LocalSigner, PrivateKeyError, default_service_signer};

/// Emulator settings.
#[derive(Clone, Debug)]
pub struct EmulatorConfig {
    /// Address space accounts are created in.
    pub chain: Chain,
    /// Service account key, the deterministic default key if unset.
    pub service_key: Option<LocalSigner>,
    /// Initial balance of the service account.
    pub service_balance: UFix64,
    /// Largest gas limit a transaction may request.
    pub max_gas_limit: u64,
    /// Number of blocks after its reference block for which a transaction stays valid.
    pub transaction_expiry: u64,
    /// Genesis block timestamp, the current time if unset.
    pub genesis_timestamp: Option<u64>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            chain: Chain::Emulator,
            service_key: None,
            service_balance: Self::DEFAULT_SERVICE_BALANCE,
            max_gas_limit: DEFAULT_GAS_LIMIT,
            transaction_expiry: Self::DEFAULT_TRANSACTION_EXPIRY,
            genesis_timestamp: None,
        }
    }
}

impl EmulatorConfig {
    /// One billion tokens.
    pub const DEFAULT_SERVICE_BALANCE: UFix64 = UFix64::from_raw(1_000_000_000 * UFix64::SCALE);

    /// Transactions expire 600 blocks after their reference block.
    pub const DEFAULT_TRANSACTION_EXPIRY: u64 = 600;

    /// Test config with a fixed genesis timestamp.
    #[doc(hidden)]
    pub fn test() -> Self {
        Self { genesis_timestamp: Some(0), ..Default::default() }
    }

    /// Sets the service account key.
    #[must_use]
    pub fn with_service_key(mut self, service_key: Option<LocalSigner>) -> Self {
        self.service_key = service_key;
        self
    }

    /// Sets the initial service account balance.
    #[must_use]
    pub fn with_service_balance(mut self, balance: UFix64) -> Self {
        self.service_balance = balance;
        self
    }

    /// Sets the chain.
    #[must_use]
    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chain = chain;
        self
    }

    /// Sets the maximum gas limit.
    #[must_use]
    pub fn with_max_gas_limit(mut self, max_gas_limit: u64) -> Self {
        self.max_gas_limit = max_gas_limit;
        self
    }

    /// Sets the transaction expiry in blocks.
    #[must_use]
    pub fn with_transaction_expiry(mut self, transaction_expiry: u64) -> Self {
        self.transaction_expiry = transaction_expiry;
        self
    }

    /// Sets the genesis timestamp.
    #[must_use]
    pub fn with_genesis_timestamp(mut self, timestamp: Option<u64>) -> Self {
        self.genesis_timestamp = timestamp;
        self
    }

    /// Returns the configured service signer or the default one.
    pub fn service_signer(&self) -> Result<LocalSigner, PrivateKeyError> {
        match &self.service_key {
            Some(signer) => Ok(signer.clone()),
            None => default_service_signer(),
        }
    }

    /// Genesis settings derived from this config.
    pub fn genesis(&self, service_signer: &LocalSigner) -> GenesisConfig {
        GenesisConfig {
            timestamp: self
                .genesis_timestamp
                .unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64),
            service_key: service_signer.account_key(),
            service_balance: self.service_balance,
        }
    }
}
