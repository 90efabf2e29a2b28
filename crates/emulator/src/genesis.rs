//! Genesis settings

use crate::Ledger;
use alloy_primitives::Bytes;
use flow_harness_primitives::{Address, UFix64};
use flow_harness_wallets::AccountKey;

/// Genesis settings
#[derive(Clone, Debug)]
pub struct GenesisConfig {
    /// The initial timestamp for the genesis block
    pub timestamp: u64,
    /// Key installed on the service account and the core contract accounts
    pub service_key: AccountKey,
    /// Initial balance of the service account
    pub service_balance: UFix64,
}

/// Addresses of the core contracts deployed at genesis, in deployment order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenesisContracts {
    /// Account holding `FungibleToken`.
    pub fungible_token: Address,
    /// Account holding `FlowToken`.
    pub flow_token: Address,
    /// Account holding `FlowFees`.
    pub fees: Address,
}

// === impl GenesisConfig ===

impl GenesisConfig {
    /// Populates an empty ledger: the service account first, then one account per core contract.
    pub fn apply(&self, ledger: &mut Ledger) -> GenesisContracts {
        let service = ledger.create_account(vec![self.service_key.clone()]);
        if let Some(account) = ledger.account_mut(&service) {
            account.balance = self.service_balance;
        }

        let mut deploy = |name: &str| {
            let address = ledger.create_account(vec![self.service_key.clone()]);
            if let Some(account) = ledger.account_mut(&address) {
                account.contracts.insert(name.to_string(), contract_stub(name));
            }
            debug!(target: "emulator::genesis", %address, name, "deployed core contract");
            address
        };

        let fungible_token = deploy("FungibleToken");
        let flow_token = deploy("FlowToken");
        let fees = deploy("FlowFees");
        GenesisContracts { fungible_token, flow_token, fees }
    }
}

fn contract_stub(name: &str) -> Bytes {
    format!("access(all) contract {name} {{}}").into_bytes().into()
}
