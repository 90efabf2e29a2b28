//! The in-memory ledger

use crate::{
    Account, BuiltinRuntime, EmulatorConfig, GenesisContracts, Ledger, Runtime,
    error::{BlockchainError, InvalidTransactionError},
    runtime::Invocation,
};
use flow_harness_primitives::{
    Address, Block, Chain, Composite, Event, ExecutionError, Identifier, ScriptResult, Transaction,
    TransactionResult, TransactionSignature, Value,
};
use flow_harness_wallets::{AccountKey, LocalSigner};
use parking_lot::RwLock;
use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt,
    sync::Arc,
};

/// An in-process ledger.
///
/// Transactions move through three stages: [`add_transaction`](Self::add_transaction) validates
/// and queues them in the pending block,
/// [`execute_next_transaction`](Self::execute_next_transaction) runs the oldest queued one, and
/// [`commit_block`](Self::commit_block) seals everything executed so far into a new block.
///
/// All state sits behind a lock so the handle can be shared by reference.
pub struct Blockchain {
    config: EmulatorConfig,
    service_signer: LocalSigner,
    contracts: GenesisContracts,
    runtime: Arc<dyn Runtime>,
    state: RwLock<State>,
}

#[derive(Debug)]
struct State {
    ledger: Ledger,
    blocks: Vec<Block>,
    block_heights: HashMap<Identifier, u64>,
    /// Added but not executed yet.
    pending: VecDeque<Transaction>,
    /// Executed, waiting to be sealed in the next block.
    executed: Vec<Identifier>,
    results: HashMap<Identifier, TransactionResult>,
    /// Every transaction ever added.
    seen: HashSet<Identifier>,
}

// === impl State ===

impl State {
    fn latest_block(&self) -> &Block {
        // genesis is inserted on construction and blocks are never removed
        &self.blocks[self.blocks.len() - 1]
    }
}

// === impl Blockchain ===

impl Blockchain {
    /// Creates a ledger with the genesis state described by `config`.
    pub fn new(config: EmulatorConfig) -> Result<Self, BlockchainError> {
        let service_signer = config.service_signer()?;
        let genesis = config.genesis(&service_signer);

        let mut ledger = Ledger::new(config.chain);
        let contracts = genesis.apply(&mut ledger);
        let genesis_block = Block::genesis(genesis.timestamp);
        debug!(
            target: "emulator::blockchain",
            chain = %config.chain,
            service = %config.chain.service_address(),
            genesis = %genesis_block.id,
            "created blockchain"
        );

        let state = State {
            ledger,
            block_heights: HashMap::from([(genesis_block.id, 0)]),
            blocks: vec![genesis_block],
            pending: VecDeque::new(),
            executed: Vec::new(),
            results: HashMap::new(),
            seen: HashSet::new(),
        };
        Ok(Self {
            config,
            service_signer,
            contracts,
            runtime: Arc::new(BuiltinRuntime),
            state: RwLock::new(state),
        })
    }

    /// Replaces the runtime transactions and scripts are executed with.
    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Runtime + 'static) -> Self {
        self.runtime = Arc::new(runtime);
        self
    }

    /// The chain accounts are created on.
    pub fn chain(&self) -> Chain {
        self.config.chain
    }

    /// The service account address.
    pub fn service_address(&self) -> Address {
        self.config.chain.service_address()
    }

    /// The service account signer.
    pub fn service_signer(&self) -> &LocalSigner {
        &self.service_signer
    }

    /// The key registered on the service account at genesis.
    pub fn service_key(&self) -> AccountKey {
        self.service_signer.account_key()
    }

    /// Accounts holding the core contracts.
    pub fn contracts(&self) -> GenesisContracts {
        self.contracts
    }

    /// The most recently sealed block.
    pub fn latest_block(&self) -> Block {
        self.state.read().latest_block().clone()
    }

    /// Id of the most recently sealed block.
    pub fn latest_block_id(&self) -> Identifier {
        self.state.read().latest_block().id
    }

    /// Returns the block at `height`.
    pub fn get_block_by_height(&self, height: u64) -> Result<Block, BlockchainError> {
        let state = self.state.read();
        usize::try_from(height)
            .ok()
            .and_then(|index| state.blocks.get(index))
            .cloned()
            .ok_or(BlockchainError::BlockNotFound(height))
    }

    /// Returns the account at `address`.
    pub fn get_account(&self, address: &Address) -> Result<Account, BlockchainError> {
        self.state
            .read()
            .ledger
            .account(address)
            .cloned()
            .ok_or(BlockchainError::AccountNotFound(*address))
    }

    /// Returns the result of an executed transaction.
    pub fn get_transaction_result(
        &self,
        id: &Identifier,
    ) -> Result<TransactionResult, BlockchainError> {
        self.state
            .read()
            .results
            .get(id)
            .cloned()
            .ok_or(BlockchainError::TransactionResultNotFound(*id))
    }

    /// Number of transactions waiting to be executed.
    pub fn pending_transaction_count(&self) -> usize {
        self.state.read().pending.len()
    }

    /// Validates `tx` and appends it to the pending block.
    pub fn add_transaction(&self, tx: &Transaction) -> Result<(), BlockchainError> {
        let id = tx.id();
        let mut state = self.state.write();
        self.validate(&state, tx, id)?;
        state.seen.insert(id);
        state.pending.push_back(tx.clone());
        trace!(
            target: "emulator::blockchain",
            %id,
            pending = state.pending.len(),
            "added transaction"
        );
        Ok(())
    }

    fn validate(
        &self,
        state: &State,
        tx: &Transaction,
        id: Identifier,
    ) -> Result<(), InvalidTransactionError> {
        if tx.script.is_empty() {
            return Err(InvalidTransactionError::EmptyScript);
        }
        if tx.payer.is_empty() {
            return Err(InvalidTransactionError::MissingPayer);
        }
        if tx.proposal_key.address.is_empty() {
            return Err(InvalidTransactionError::MissingProposer);
        }
        if tx.gas_limit > self.config.max_gas_limit {
            return Err(InvalidTransactionError::GasLimitExceeded {
                actual: tx.gas_limit,
                maximum: self.config.max_gas_limit,
            });
        }
        let reference_height = state
            .block_heights
            .get(&tx.reference_block_id)
            .copied()
            .ok_or(InvalidTransactionError::UnknownReferenceBlock(tx.reference_block_id))?;
        let latest_height = state.latest_block().height;
        if latest_height - reference_height > self.config.transaction_expiry {
            return Err(InvalidTransactionError::Expired { reference_height, latest_height });
        }
        if state.seen.contains(&id) {
            return Err(InvalidTransactionError::Duplicate(id));
        }
        Ok(())
    }

    /// Executes the oldest pending transaction.
    ///
    /// Signature and sequence number failures, as well as runtime errors, produce a reverted
    /// result rather than an error.
    pub fn execute_next_transaction(&self) -> Result<TransactionResult, BlockchainError> {
        let mut state = self.state.write();
        let tx = state.pending.pop_front().ok_or(BlockchainError::NoPendingTransaction)?;
        let id = tx.id();
        let transaction_index = state.executed.len() as u32;

        let result = match self.execute(&mut state.ledger, &tx) {
            Ok((events, logs)) => {
                let events = events
                    .into_iter()
                    .enumerate()
                    .map(|(event_index, composite)| Event {
                        event_type: composite.id.clone(),
                        transaction_id: id,
                        transaction_index,
                        event_index: event_index as u32,
                        value: Value::Event(composite),
                    })
                    .collect();
                TransactionResult { logs, ..TransactionResult::success(id, events) }
            }
            Err(error) => {
                debug!(target: "emulator::blockchain", %id, %error, "transaction reverted");
                TransactionResult::reverted_with(id, error)
            }
        };

        trace!(
            target: "emulator::blockchain",
            %id,
            succeeded = result.succeeded(),
            "executed transaction"
        );
        state.executed.push(id);
        state.results.insert(id, result.clone());
        Ok(result)
    }

    fn execute(
        &self,
        ledger: &mut Ledger,
        tx: &Transaction,
    ) -> Result<(Vec<Composite>, Vec<String>), ExecutionError> {
        verify_signatures(ledger, tx)?;

        // the proposal key's sequence number is consumed even if the script fails
        let proposal = &tx.proposal_key;
        let key = ledger
            .account_mut(&proposal.address)
            .and_then(|account| account.key_mut(proposal.key_index))
            .ok_or_else(|| {
                ExecutionError::new(
                    ExecutionError::INVALID_PROPOSAL_SIGNATURE,
                    format!(
                        "proposal key {} of {} does not exist",
                        proposal.key_index, proposal.address
                    ),
                )
            })?;
        if key.sequence_number != proposal.sequence_number {
            return Err(ExecutionError::new(
                ExecutionError::INVALID_PROPOSAL_SEQUENCE_NUMBER,
                format!(
                    "invalid proposal key: address {}, index {}, expected sequence number {}, \
                     got {}",
                    proposal.address,
                    proposal.key_index,
                    key.sequence_number,
                    proposal.sequence_number
                ),
            ));
        }
        key.sequence_number += 1;

        let arguments = decode_arguments(tx.arguments.as_slice())?;
        let invocation = Invocation {
            script: &tx.script,
            arguments,
            authorizers: &tx.authorizers,
            service_address: self.service_address(),
        };
        let mut scratch = ledger.clone();
        let output = self.runtime.execute_transaction(&invocation, &mut scratch)?;
        *ledger = scratch;
        Ok((output.events, output.logs))
    }

    /// Runs a read-only script against the current state.
    pub fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptResult, BlockchainError> {
        let arguments = match decode_arguments(arguments) {
            Ok(arguments) => arguments,
            Err(error) => return Ok(ScriptResult::failure(error)),
        };
        let invocation = Invocation {
            script,
            arguments,
            authorizers: &[],
            service_address: self.service_address(),
        };

        let state = self.state.read();
        let result = match self.runtime.execute_script(&invocation, &state.ledger) {
            Ok(value) => ScriptResult::success(value),
            Err(error) => {
                debug!(target: "emulator::blockchain", %error, "script failed");
                ScriptResult::failure(error)
            }
        };
        Ok(result)
    }

    /// Seals all executed transactions into a new block.
    ///
    /// Fails if transactions are still waiting to be executed. Empty blocks are allowed.
    pub fn commit_block(&self) -> Result<Block, BlockchainError> {
        let mut state = self.state.write();
        if !state.pending.is_empty() {
            return Err(BlockchainError::PendingTransactions(state.pending.len()));
        }

        let (parent_id, height, parent_timestamp) = {
            let parent = state.latest_block();
            (parent.id, parent.height + 1, parent.timestamp)
        };
        let timestamp = (chrono::Utc::now().timestamp().max(0) as u64).max(parent_timestamp);
        let block = Block::new(parent_id, height, timestamp, std::mem::take(&mut state.executed));
        state.block_heights.insert(block.id, block.height);
        state.blocks.push(block.clone());
        debug!(
            target: "emulator::blockchain",
            height = block.height,
            id = %block.id,
            transactions = block.transaction_ids.len(),
            "committed block"
        );
        Ok(block)
    }

    /// Executes every pending transaction and commits a block.
    pub fn execute_and_commit_block(
        &self,
    ) -> Result<(Block, Vec<TransactionResult>), BlockchainError> {
        let mut results = Vec::new();
        while self.pending_transaction_count() > 0 {
            results.push(self.execute_next_transaction()?);
        }
        Ok((self.commit_block()?, results))
    }

    /// Creates an account with `keys` through a service account transaction and commits it.
    pub fn create_account(&self, keys: &[AccountKey]) -> Result<Address, BlockchainError> {
        let (first, rest) = keys.split_first().ok_or(BlockchainError::MissingAccountKey)?;
        let service = self.service_address();
        let sequence_number =
            self.get_account(&service)?.key(0).map(|key| key.sequence_number).unwrap_or_default();

        let mut tx = Transaction::new()
            .with_script(&b"create_account"[..])
            .with_argument(&Value::String(first.public_key.hex()))
            .with_argument(&Value::from(first.hash_algorithm.name()))
            .with_argument(&Value::from(first.signature_algorithm.name()))
            .with_proposal_key(service, 0, sequence_number)
            .with_payer(service)
            .with_authorizer(service)
            .with_reference_block_id(self.latest_block_id());
        tx.sign_envelope(service, 0, &self.service_signer)?;

        self.add_transaction(&tx)?;
        let result = self.execute_next_transaction()?;
        self.commit_block()?;
        if let Some(error) = result.error {
            return Err(BlockchainError::Reverted {
                id: result.transaction_id,
                message: error.to_string(),
            });
        }
        let address = result
            .events_of("flow.AccountCreated")
            .find_map(|event| event.value.as_event()?.field("address")?.as_address())
            .ok_or_else(|| BlockchainError::Reverted {
                id: result.transaction_id,
                message: "no account was created".to_string(),
            })?;

        // the fixture runtime installs a single key, the remaining ones are added directly
        if !rest.is_empty() {
            let mut state = self.state.write();
            if let Some(account) = state.ledger.account_mut(&address) {
                for key in rest {
                    account.add_key(key.clone());
                }
            }
        }
        Ok(address)
    }
}

impl fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blockchain")
            .field("config", &self.config)
            .field("contracts", &self.contracts)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn decode_arguments(arguments: &[impl AsRef<[u8]>]) -> Result<Vec<Value>, ExecutionError> {
    arguments
        .iter()
        .enumerate()
        .map(|(index, argument)| {
            Value::decode(argument.as_ref()).map_err(|err| {
                ExecutionError::runtime(format!("invalid argument at position {index}: {err}"))
            })
        })
        .collect()
}

/// Checks every attached signature and the key weight of each required signer.
///
/// The payer must sign the envelope. The proposer must sign with its proposal key and every
/// authorizer needs [`AccountKey::FULL_WEIGHT`], from payload or envelope signatures.
fn verify_signatures(ledger: &Ledger, tx: &Transaction) -> Result<(), ExecutionError> {
    let payload_message = tx.payload_message();
    let envelope_message = tx.envelope_message();
    let payload_weights = verify_all(
        ledger,
        &tx.payload_signatures,
        &payload_message,
        ExecutionError::INVALID_PAYLOAD_SIGNATURE,
    )?;
    let envelope_weights = verify_all(
        ledger,
        &tx.envelope_signatures,
        &envelope_message,
        ExecutionError::INVALID_ENVELOPE_SIGNATURE,
    )?;

    let proposal = &tx.proposal_key;
    let proposer_signed = tx
        .payload_signatures
        .iter()
        .chain(&tx.envelope_signatures)
        .any(|sig| sig.address == proposal.address && sig.key_index == proposal.key_index);
    if !proposer_signed {
        return Err(ExecutionError::new(
            ExecutionError::INVALID_PROPOSAL_SIGNATURE,
            format!(
                "missing signature for proposal key {} of {}",
                proposal.key_index, proposal.address
            ),
        ));
    }

    let envelope_weight =
        |address: &Address| envelope_weights.get(address).copied().unwrap_or_default();
    if envelope_weight(&tx.payer) < AccountKey::FULL_WEIGHT {
        return Err(ExecutionError::new(
            ExecutionError::INVALID_ENVELOPE_SIGNATURE,
            format!("payer {} did not sign the envelope with full weight", tx.payer),
        ));
    }

    for authorizer in &tx.authorizers {
        let weight = payload_weights.get(authorizer).copied().unwrap_or_default() +
            envelope_weight(authorizer);
        if weight < AccountKey::FULL_WEIGHT {
            return Err(ExecutionError::new(
                ExecutionError::ACCOUNT_AUTHORIZATION,
                format!(
                    "authorizer {authorizer} has insufficient key weight: {weight} of {}",
                    AccountKey::FULL_WEIGHT
                ),
            ));
        }
    }
    Ok(())
}

/// Verifies signatures over `message` and sums the key weight per account.
fn verify_all(
    ledger: &Ledger,
    signatures: &[TransactionSignature],
    message: &[u8],
    code: u16,
) -> Result<HashMap<Address, u32>, ExecutionError> {
    let mut weights = HashMap::new();
    let mut counted = HashSet::new();
    for sig in signatures {
        let key = ledger.account(&sig.address).and_then(|account| account.key(sig.key_index));
        let valid = key.is_some_and(|key| key.verify(message, &sig.signature));
        if !valid {
            return Err(ExecutionError::new(
                code,
                format!("invalid signature: key {} of account {}", sig.key_index, sig.address),
            ));
        }
        if let Some(key) = key
            && counted.insert((sig.address, sig.key_index))
        {
            *weights.entry(sig.address).or_default() += key.weight;
        }
    }
    Ok(weights)
}
