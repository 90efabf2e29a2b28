//! Backend selection and well-known contract addresses

use crate::{
    backend::{Backend, LedgerBackend, NetworkBackend},
    error::{HarnessError, ProtocolError, SetupError},
    protocol, utils,
};
use flow_emulator::{Blockchain, EmulatorConfig};
use flow_harness_config::{HarnessConfig, NetworkType};
use flow_harness_primitives::{
    Address, AddressGenerator, Chain, Signer, Transaction, TransactionResult, Value,
};
use flow_harness_wallets::{
    AccountKey, HashAlgorithm, LocalSigner, SignatureAlgorithm, create_private_key_signer_with,
};
use std::path::Path;

/// Addresses of the core contracts, in deployment order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contracts {
    /// `FungibleToken`.
    pub fungible_token: Address,
    /// `FlowToken`, the primary token.
    pub flow_token: Address,
    /// `FlowFees`.
    pub fees: Address,
}

impl Contracts {
    /// Template placeholder for [`Contracts::fungible_token`].
    pub const FUNGIBLE_TOKEN_PLACEHOLDER: &'static str = "0xFUNGIBLETOKENADDRESS";
    /// Template placeholder for [`Contracts::flow_token`].
    pub const FLOW_TOKEN_PLACEHOLDER: &'static str = "0xFLOWTOKENADDRESS";
    /// Template placeholder for [`Contracts::fees`].
    pub const FEES_PLACEHOLDER: &'static str = "0xFLOWFEESADDRESS";

    /// The three accounts generated right after the service account of `chain`.
    pub fn generate(chain: Chain) -> Self {
        let mut generator = AddressGenerator::new(chain);
        // service account
        generator.next_address();
        let fungible_token = generator.next_address();
        let flow_token = generator.next_address();
        let fees = generator.next_address();
        Self { fungible_token, flow_token, fees }
    }

    /// Replaces the address placeholders in `template`.
    pub fn render(&self, template: &str) -> String {
        template
            .replace(Self::FUNGIBLE_TOKEN_PLACEHOLDER, &self.fungible_token.to_string())
            .replace(Self::FLOW_TOKEN_PLACEHOLDER, &self.flow_token.to_string())
            .replace(Self::FEES_PLACEHOLDER, &self.fees.to_string())
    }

    /// Reads a template file and renders it.
    pub fn read_template(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, SetupError> {
        let template = utils::read_file(path)?;
        Ok(self.render(&String::from_utf8_lossy(&template)).into_bytes())
    }
}

/// The account that pays for and proposes harness transactions.
#[derive(Clone, Debug)]
pub struct ServiceAccount {
    /// Account address.
    pub address: Address,
    /// Signer for key index 0.
    pub signer: LocalSigner,
}

/// A bootstrapped test environment.
#[derive(Debug)]
pub struct Harness {
    /// The selected backend.
    pub backend: LedgerBackend,
    /// Core contract addresses.
    pub contracts: Contracts,
    /// The service account.
    pub service: ServiceAccount,
    /// The chain addresses are generated for.
    pub chain: Chain,
}

/// Creates the backend selected by `config`.
///
/// `testnet` connects to the access node at `config.address` and requires a service account key.
/// Everything else starts an in-process emulator, keyed with the configured service key or the
/// default one. Configured keys are P-256/SHA3-256 unless other algorithms are configured.
pub fn bootstrap(config: &HarnessConfig) -> Result<Harness, SetupError> {
    let (backend, chain, signer) = match config.network_type {
        NetworkType::Testnet => {
            let key = config
                .service_account_private_key()
                .ok_or_else(|| SetupError::MissingServiceKey(config.network_type.to_string()))?;
            let signer = service_signer(config, key)?;
            let endpoint = config.endpoint()?;
            info!(target: "harness::bootstrap", %endpoint, "connecting to network");
            let client = NetworkBackend::new(endpoint, config.poll_interval())?;
            (LedgerBackend::Network(client), Chain::Testnet, signer)
        }
        NetworkType::Emulator => {
            let service_key = config
                .service_account_private_key()
                .map(|key| service_signer(config, key))
                .transpose()?;
            let emulator_config = EmulatorConfig::default().with_service_key(service_key);
            let chain = Blockchain::new(emulator_config).map_err(SetupError::Emulator)?;
            let signer = chain.service_signer().clone();
            let service = chain.service_address();
            debug!(target: "harness::bootstrap", %service, "started emulator");
            (LedgerBackend::Emulator(chain), Chain::Emulator, signer)
        }
    };

    let contracts = Contracts::generate(chain);
    let service = ServiceAccount { address: chain.service_address(), signer };
    Ok(Harness { backend, contracts, service, chain })
}

fn service_signer(config: &HarnessConfig, key: &str) -> Result<LocalSigner, SetupError> {
    let signature_algorithm = match config.service_account_signature_algorithm() {
        None => SignatureAlgorithm::default(),
        Some(name) => SignatureAlgorithm::from_name(name)
            .ok_or_else(|| SetupError::UnsupportedKeyAlgorithm(name.to_string()))?,
    };
    let hash_algorithm = match config.service_account_hash_algorithm() {
        None => HashAlgorithm::default(),
        Some(name) => HashAlgorithm::from_name(name)
            .ok_or_else(|| SetupError::UnsupportedKeyAlgorithm(name.to_string()))?,
    };
    Ok(create_private_key_signer_with(key, signature_algorithm, hash_algorithm)?)
}

// === impl Harness ===

impl Harness {
    /// Bootstraps from the `FLOW_` environment.
    pub fn from_env() -> Result<Self, SetupError> {
        bootstrap(&HarnessConfig::try_load()?)
    }

    /// A transaction proposed and paid for by the service account, using its current sequence
    /// number.
    pub fn service_transaction(
        &self,
        script: impl Into<Vec<u8>>,
    ) -> Result<Transaction, HarnessError> {
        let address = self.service.address;
        let sequence_number = self
            .backend
            .sequence_number(&address, 0)
            .map_err(|source| ProtocolError::SequenceNumber { address, source })?;
        Ok(Transaction::new()
            .with_script(script.into())
            .with_proposal_key(address, 0, sequence_number)
            .with_payer(address))
    }

    /// See [`protocol::sign_and_submit`].
    pub fn sign_and_submit<S: Signer>(
        &self,
        tx: &mut Transaction,
        signer_addresses: &[Address],
        signers: &[S],
        should_revert: bool,
    ) -> Result<TransactionResult, HarnessError> {
        protocol::sign_and_submit(&self.backend, tx, signer_addresses, signers, should_revert)
    }

    /// Signs `tx` with the service account alone and submits it.
    pub fn submit_as_service(
        &self,
        tx: &mut Transaction,
        should_revert: bool,
    ) -> Result<TransactionResult, HarnessError> {
        self.sign_and_submit(tx, &[self.service.address], &[&self.service.signer], should_revert)
    }

    /// See [`protocol::execute_script_and_check`].
    pub fn execute_script_and_check(&self, script: &[u8]) -> Result<Value, HarnessError> {
        protocol::execute_script_and_check(&self.backend, script)
    }

    /// See [`protocol::execute_script_with_args_and_check`].
    pub fn execute_script_with_args_and_check(
        &self,
        script: &[u8],
        arguments: &[Value],
    ) -> Result<Value, HarnessError> {
        protocol::execute_script_with_args_and_check(&self.backend, script, arguments)
    }

    /// Creates an account holding `key` and returns its address.
    pub fn create_account(&self, key: &AccountKey) -> Result<Address, HarnessError> {
        const ACCOUNT_CREATED: &str = "flow.AccountCreated";

        let mut tx = self
            .service_transaction("create_account")?
            .with_argument(&Value::String(key.public_key.hex()))
            .with_argument(&Value::from(key.hash_algorithm.name()))
            .with_argument(&Value::from(key.signature_algorithm.name()))
            .with_authorizer(self.service.address);
        let result = self.submit_as_service(&mut tx, false)?;
        result
            .events_of(ACCOUNT_CREATED)
            .find_map(|event| event.value.as_event()?.field("address")?.as_address())
            .ok_or_else(|| {
                let id = result.transaction_id;
                ProtocolError::MissingEvent { id, event_type: ACCOUNT_CREATED }.into()
            })
    }

    /// Reads a template and fills in the contract addresses.
    pub fn read_template(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, SetupError> {
        self.contracts.read_template(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_harness_wallets::{create_private_key_signer, utils::DEFAULT_SERVICE_PRIVATE_KEY};

    #[test]
    fn contracts_follow_service_account() {
        let contracts = Contracts::generate(Chain::Emulator);
        assert_eq!(contracts.fungible_token, Chain::Emulator.address_at(2));
        assert_eq!(contracts.flow_token, Chain::Emulator.address_at(3));
        assert_eq!(contracts.fees, Chain::Emulator.address_at(4));
        assert_ne!(Contracts::generate(Chain::Testnet), contracts);
    }

    #[test]
    fn renders_placeholders() {
        let contracts = Contracts::generate(Chain::Emulator);
        let rendered = contracts.render(
            "import FungibleToken from 0xFUNGIBLETOKENADDRESS\n\
             import FlowToken from 0xFLOWTOKENADDRESS\n\
             import FlowFees from 0xFLOWFEESADDRESS",
        );
        assert!(rendered.contains(&format!("FungibleToken from {}", contracts.fungible_token)));
        assert!(rendered.contains(&format!("FlowToken from {}", contracts.flow_token)));
        assert!(rendered.contains(&format!("FlowFees from {}", contracts.fees)));
        assert!(!rendered.contains("ADDRESS"));
    }

    #[test]
    fn emulator_contracts_match_genesis() {
        let harness = bootstrap(&HarnessConfig::default()).unwrap();
        assert_eq!(harness.chain, Chain::Emulator);
        let chain = harness.backend.as_emulator().unwrap();
        let genesis = chain.contracts();
        assert_eq!(harness.contracts.fungible_token, genesis.fungible_token);
        assert_eq!(harness.contracts.flow_token, genesis.flow_token);
        assert_eq!(harness.contracts.fees, genesis.fees);
        assert_eq!(harness.service.address, chain.service_address());
    }

    #[test]
    fn emulator_uses_configured_service_key() {
        let signer = LocalSigner::random(Default::default());
        let key = signer.to_bytes().to_string();
        let harness =
            bootstrap(&HarnessConfig::default().with_service_account_private_key(key)).unwrap();
        assert_eq!(harness.service.signer.public_key(), signer.public_key());

        let default = bootstrap(&HarnessConfig::default()).unwrap();
        let expected = create_private_key_signer(DEFAULT_SERVICE_PRIVATE_KEY).unwrap();
        assert_eq!(default.service.signer.public_key(), expected.public_key());
    }

    #[test]
    fn service_key_defaults_to_p256() {
        let config = HarnessConfig::default()
            .with_network_type(NetworkType::Testnet)
            .with_address("localhost:8888")
            .with_service_account_private_key(DEFAULT_SERVICE_PRIVATE_KEY);
        let harness = bootstrap(&config).unwrap();
        assert_eq!(harness.service.signer.signature_algorithm(), SignatureAlgorithm::EcdsaP256);
        assert_eq!(harness.service.signer.hash_algorithm(), HashAlgorithm::Sha3_256);
    }

    #[test]
    fn service_key_algorithms_from_config() {
        let config = HarnessConfig::default()
            .with_service_account_private_key(DEFAULT_SERVICE_PRIVATE_KEY)
            .with_service_account_key_algorithms("ECDSA_secp256k1", "SHA2_256");
        let harness = bootstrap(&config).unwrap();
        let signer = &harness.service.signer;
        assert_eq!(signer.signature_algorithm(), SignatureAlgorithm::EcdsaSecp256k1);
        assert_eq!(signer.hash_algorithm(), HashAlgorithm::Sha2_256);

        // the emulator registers the configured curve for its service account
        let chain = harness.backend.as_emulator().unwrap();
        assert_eq!(chain.service_key().signature_algorithm, SignatureAlgorithm::EcdsaSecp256k1);

        let config = config.with_service_account_key_algorithms("ECDSA_P384", "SHA3_256");
        let err = bootstrap(&config).unwrap_err();
        assert!(matches!(err, SetupError::UnsupportedKeyAlgorithm(name) if name == "ECDSA_P384"));
    }

    #[test]
    fn testnet_requires_service_key() {
        let config = HarnessConfig::default()
            .with_network_type(NetworkType::Testnet)
            .with_address("access.devnet.nodes.onflow.org:9000");
        let err = bootstrap(&config).unwrap_err();
        assert!(matches!(err, SetupError::MissingServiceKey(_)));
    }

    #[test]
    fn testnet_requires_endpoint() {
        let config = HarnessConfig::default()
            .with_network_type(NetworkType::Testnet)
            .with_service_account_private_key(DEFAULT_SERVICE_PRIVATE_KEY);
        let err = bootstrap(&config).unwrap_err();
        assert!(matches!(err, SetupError::Endpoint(_)));
    }

    #[test]
    fn testnet_builds_network_backend() {
        let config = HarnessConfig::default()
            .with_network_type(NetworkType::Testnet)
            .with_address("localhost:8888")
            .with_service_account_private_key(DEFAULT_SERVICE_PRIVATE_KEY);
        let harness = bootstrap(&config).unwrap();
        assert_eq!(harness.chain, Chain::Testnet);
        assert_eq!(harness.service.address, Chain::Testnet.service_address());
        assert_eq!(harness.contracts, Contracts::generate(Chain::Testnet));
        let client = harness.backend.as_network().unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:8888/");
    }

    #[test]
    fn malformed_service_key_is_fatal() {
        let config = HarnessConfig::default().with_service_account_private_key("not hex");
        let err = HarnessError::from(bootstrap(&config).unwrap_err());
        assert!(err.is_fatal());
    }
}
