//! Account state

use alloy_primitives::Bytes;
use flow_harness_primitives::{Address, AddressGenerator, Chain, UFix64};
use flow_harness_wallets::AccountKey;
use std::collections::BTreeMap;

/// An account stored in the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// The account address.
    pub address: Address,
    /// Primary token balance.
    pub balance: UFix64,
    /// Registered keys, indexed by [`AccountKey::index`].
    pub keys: Vec<AccountKey>,
    /// Deployed contract code by name.
    pub contracts: BTreeMap<String, Bytes>,
}

impl Account {
    /// Creates an empty account.
    pub fn new(address: Address) -> Self {
        Self { address, balance: UFix64::ZERO, keys: Vec::new(), contracts: BTreeMap::new() }
    }

    /// Returns the key at `index`.
    pub fn key(&self, index: u32) -> Option<&AccountKey> {
        self.keys.iter().find(|key| key.index == index)
    }

    /// Returns the key at `index` mutably.
    pub fn key_mut(&mut self, index: u32) -> Option<&mut AccountKey> {
        self.keys.iter_mut().find(|key| key.index == index)
    }

    /// Appends a key, assigning it the next free index.
    pub fn add_key(&mut self, mut key: AccountKey) -> u32 {
        let index = self.keys.iter().map(|key| key.index + 1).max().unwrap_or_default();
        key.index = index;
        self.keys.push(key);
        index
    }

    /// Names of deployed contracts in lexical order.
    pub fn contract_names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }
}

/// The full account state together with the address generator that assigns new accounts.
///
/// Execution runs against a clone and only replaces the original once it succeeded.
#[derive(Clone, Debug)]
pub struct Ledger {
    accounts: BTreeMap<Address, Account>,
    generator: AddressGenerator,
}

// === impl Ledger ===

impl Ledger {
    /// An empty ledger for `chain`.
    pub fn new(chain: Chain) -> Self {
        Self { accounts: BTreeMap::new(), generator: AddressGenerator::new(chain) }
    }

    /// The chain this ledger assigns addresses on.
    pub fn chain(&self) -> Chain {
        self.generator.chain()
    }

    /// Returns the account at `address`.
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Returns the account at `address` mutably.
    pub fn account_mut(&mut self, address: &Address) -> Option<&mut Account> {
        self.accounts.get_mut(address)
    }

    /// Creates an account at the next generated address.
    pub fn create_account(&mut self, keys: Vec<AccountKey>) -> Address {
        let address = self.generator.next_address();
        let mut account = Account::new(address);
        for key in keys {
            account.add_key(key);
        }
        trace!(target: "emulator::ledger", %address, "created account");
        self.accounts.insert(address, account);
        address
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Iterates accounts ordered by address.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}
