//! Transaction model, canonical encoding and signing.
//!
//! A transaction is signed in two layers. Authorizers and the proposer sign the *payload*,
//! the payer signs the *envelope*, which is the payload together with every payload signature.
//! Both messages are prefixed with [`TRANSACTION_DOMAIN_TAG`].

use crate::{Address, Identifier, Signer, SignerError, Value, sha3_256};
use alloy_primitives::{B256, Bytes};
use alloy_rlp::{Encodable, RlpEncodable};
use serde::{Deserialize, Serialize};

/// Gas limit applied when none is set explicitly.
pub const DEFAULT_GAS_LIMIT: u64 = 9999;

/// Domain separation tag for transaction signatures, right-padded with zeros to 32 bytes.
pub const TRANSACTION_DOMAIN_TAG: [u8; 32] = domain_tag(b"FLOW-V0.0-transaction");

const fn domain_tag(tag: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let mut i = 0;
    while i < tag.len() {
        padded[i] = tag[i];
        i += 1;
    }
    padded
}

/// The key that proposes a transaction and whose sequence number it consumes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalKey {
    /// Account the key belongs to.
    pub address: Address,
    /// Index of the key on the account.
    pub key_index: u32,
    /// Expected sequence number of the key.
    pub sequence_number: u64,
}

/// A signature attached to a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    /// The signing account.
    pub address: Address,
    /// Position of `address` in the transaction's signer list.
    pub signer_index: usize,
    /// Index of the signing key on the account.
    pub key_index: u32,
    /// Raw signature bytes.
    pub signature: Bytes,
}

/// A transaction under construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Script source.
    pub script: Bytes,
    /// JSON-CDC encoded arguments.
    pub arguments: Vec<Bytes>,
    /// Block the transaction is anchored to. Zero until set.
    pub reference_block_id: Identifier,
    /// Execution effort limit.
    pub gas_limit: u64,
    /// Proposal key.
    pub proposal_key: ProposalKey,
    /// Account paying the fees.
    pub payer: Address,
    /// Accounts authorizing the transaction, in declaration order.
    pub authorizers: Vec<Address>,
    /// Payload signatures, sorted by signer index and then key index.
    pub payload_signatures: Vec<TransactionSignature>,
    /// Envelope signatures, sorted by signer index and then key index.
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            script: Bytes::new(),
            arguments: Vec::new(),
            reference_block_id: Identifier::ZERO,
            gas_limit: DEFAULT_GAS_LIMIT,
            proposal_key: ProposalKey::default(),
            payer: Address::EMPTY,
            authorizers: Vec::new(),
            payload_signatures: Vec::new(),
            envelope_signatures: Vec::new(),
        }
    }
}

// === impl Transaction ===

impl Transaction {
    /// Creates an empty transaction with the default gas limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the script.
    pub fn with_script(mut self, script: impl Into<Bytes>) -> Self {
        self.script = script.into();
        self
    }

    /// Appends an argument.
    pub fn with_argument(mut self, argument: &Value) -> Self {
        self.arguments.push(argument.encode().into());
        self
    }

    /// Appends a pre-encoded argument.
    pub fn with_raw_argument(mut self, argument: impl Into<Bytes>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Sets the gas limit.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Sets the proposal key.
    pub fn with_proposal_key(
        mut self,
        address: Address,
        key_index: u32,
        sequence_number: u64,
    ) -> Self {
        self.proposal_key = ProposalKey { address, key_index, sequence_number };
        self
    }

    /// Sets the payer.
    pub fn with_payer(mut self, payer: Address) -> Self {
        self.payer = payer;
        self
    }

    /// Appends an authorizer.
    pub fn with_authorizer(mut self, authorizer: Address) -> Self {
        self.authorizers.push(authorizer);
        self
    }

    /// Sets the reference block.
    pub fn with_reference_block_id(mut self, id: Identifier) -> Self {
        self.reference_block_id = id;
        self
    }

    /// Sets the reference block on an existing transaction.
    pub fn set_reference_block_id(&mut self, id: Identifier) {
        self.reference_block_id = id;
    }

    /// Every account expected to sign: proposer, payer, then authorizers, without duplicates.
    pub fn signer_list(&self) -> Vec<Address> {
        let mut signers = Vec::with_capacity(self.authorizers.len() + 2);
        let candidates = [self.proposal_key.address, self.payer]
            .into_iter()
            .chain(self.authorizers.iter().copied());
        for address in candidates {
            if !signers.contains(&address) {
                signers.push(address);
            }
        }
        signers
    }

    /// Position of `address` in the [signer list](Self::signer_list).
    pub fn signer_index(&self, address: &Address) -> Option<usize> {
        self.signer_list().iter().position(|signer| signer == address)
    }

    /// Message signed by payload signers.
    pub fn payload_message(&self) -> Vec<u8> {
        with_domain_tag(&self.payload_form())
    }

    /// Message signed by envelope signers.
    pub fn envelope_message(&self) -> Vec<u8> {
        let envelope = EnvelopeForm {
            payload: self.payload_form(),
            payload_signatures: self.payload_signature_forms(),
        };
        with_domain_tag(&envelope)
    }

    /// Signs the payload as `address` with the key at `key_index`.
    pub fn sign_payload<S: Signer + ?Sized>(
        &mut self,
        address: Address,
        key_index: u32,
        signer: &S,
    ) -> Result<(), TransactionError> {
        let signature = self.create_signature(address, key_index, signer, self.payload_message())?;
        self.payload_signatures.push(signature);
        sort_signatures(&mut self.payload_signatures);
        Ok(())
    }

    /// Signs the envelope as `address` with the key at `key_index`.
    ///
    /// Envelope signatures cover the payload signatures, so they must be applied last.
    pub fn sign_envelope<S: Signer + ?Sized>(
        &mut self,
        address: Address,
        key_index: u32,
        signer: &S,
    ) -> Result<(), TransactionError> {
        let signature = self.create_signature(address, key_index, signer, self.envelope_message())?;
        self.envelope_signatures.push(signature);
        sort_signatures(&mut self.envelope_signatures);
        Ok(())
    }

    /// The transaction id, derived from the payload and every signature.
    pub fn id(&self) -> Identifier {
        let form = TransactionForm {
            payload: self.payload_form(),
            payload_signatures: self.payload_signature_forms(),
            envelope_signatures: signature_forms(&self.envelope_signatures),
        };
        sha3_256(alloy_rlp::encode(&form))
    }

    fn create_signature<S: Signer + ?Sized>(
        &self,
        address: Address,
        key_index: u32,
        signer: &S,
        message: Vec<u8>,
    ) -> Result<TransactionSignature, TransactionError> {
        if self.reference_block_id.is_zero() {
            return Err(TransactionError::MissingReferenceBlockId);
        }
        let signer_index =
            self.signer_index(&address).ok_or(TransactionError::UnknownSigner(address))?;
        let signature = signer.sign(&message)?;
        Ok(TransactionSignature { address, signer_index, key_index, signature: signature.into() })
    }

    fn payload_form(&self) -> PayloadForm {
        PayloadForm {
            script: self.script.clone(),
            arguments: self.arguments.clone(),
            reference_block_id: self.reference_block_id,
            gas_limit: self.gas_limit,
            proposer_address: address_bytes(&self.proposal_key.address),
            proposer_key_index: u64::from(self.proposal_key.key_index),
            proposer_sequence_number: self.proposal_key.sequence_number,
            payer: address_bytes(&self.payer),
            authorizers: self.authorizers.iter().map(address_bytes).collect(),
        }
    }

    fn payload_signature_forms(&self) -> Vec<SignatureForm> {
        signature_forms(&self.payload_signatures)
    }
}

/// Errors returned when signing a [`Transaction`].
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Signing requires a reference block id.
    #[error("transaction has no reference block id")]
    MissingReferenceBlockId,
    /// The address is neither proposer, payer nor authorizer.
    #[error("{0} is not a signer of this transaction")]
    UnknownSigner(Address),
    /// The signer failed to produce a signature.
    #[error(transparent)]
    Signer(#[from] SignerError),
}

#[derive(RlpEncodable)]
struct PayloadForm {
    script: Bytes,
    arguments: Vec<Bytes>,
    reference_block_id: B256,
    gas_limit: u64,
    proposer_address: Bytes,
    proposer_key_index: u64,
    proposer_sequence_number: u64,
    payer: Bytes,
    authorizers: Vec<Bytes>,
}

#[derive(RlpEncodable)]
struct SignatureForm {
    signer_index: u64,
    key_index: u64,
    signature: Bytes,
}

#[derive(RlpEncodable)]
struct EnvelopeForm {
    payload: PayloadForm,
    payload_signatures: Vec<SignatureForm>,
}

#[derive(RlpEncodable)]
struct TransactionForm {
    payload: PayloadForm,
    payload_signatures: Vec<SignatureForm>,
    envelope_signatures: Vec<SignatureForm>,
}

fn address_bytes(address: &Address) -> Bytes {
    Bytes::copy_from_slice(address.as_bytes())
}

fn signature_forms(signatures: &[TransactionSignature]) -> Vec<SignatureForm> {
    signatures
        .iter()
        .map(|sig| SignatureForm {
            signer_index: sig.signer_index as u64,
            key_index: u64::from(sig.key_index),
            signature: sig.signature.clone(),
        })
        .collect()
}

fn sort_signatures(signatures: &mut [TransactionSignature]) {
    signatures.sort_by_key(|sig| (sig.signer_index, sig.key_index));
}

fn with_domain_tag<T: Encodable>(form: &T) -> Vec<u8> {
    let mut message = TRANSACTION_DOMAIN_TAG.to_vec();
    form.encode(&mut message);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chain;

    /// Returns the message itself, so tests can inspect what was signed.
    struct EchoSigner;

    impl Signer for EchoSigner {
        fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
            Ok(message.to_vec())
        }
    }

    struct FailingSigner;

    impl Signer for FailingSigner {
        fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, SignerError> {
            Err(SignerError::other("device disconnected"))
        }
    }

    fn addresses() -> (Address, Address, Address) {
        let chain = Chain::Emulator;
        (chain.address_at(1), chain.address_at(5), chain.address_at(6))
    }

    fn transaction() -> Transaction {
        let (proposer, payer, authorizer) = addresses();
        Transaction::new()
            .with_script(Bytes::from_static(b"noop"))
            .with_proposal_key(proposer, 0, 0)
            .with_payer(payer)
            .with_authorizer(authorizer)
            .with_reference_block_id(sha3_256(b"genesis"))
    }

    #[test]
    fn domain_tag_is_padded() {
        assert_eq!(&TRANSACTION_DOMAIN_TAG[..21], b"FLOW-V0.0-transaction");
        assert!(TRANSACTION_DOMAIN_TAG[21..].iter().all(|b| *b == 0));
    }

    #[test]
    fn signer_list_deduplicates() {
        let (proposer, _, authorizer) = addresses();
        let tx = Transaction::new()
            .with_proposal_key(proposer, 0, 0)
            .with_payer(proposer)
            .with_authorizer(authorizer)
            .with_authorizer(proposer);
        assert_eq!(tx.signer_list(), vec![proposer, authorizer]);
        assert_eq!(tx.signer_index(&authorizer), Some(1));
    }

    #[test]
    fn signing_requires_reference_block() {
        let (proposer, ..) = addresses();
        let mut tx = transaction().with_reference_block_id(Identifier::ZERO);
        assert!(matches!(
            tx.sign_payload(proposer, 0, &EchoSigner),
            Err(TransactionError::MissingReferenceBlockId)
        ));
    }

    #[test]
    fn signing_rejects_unknown_signer() {
        let stranger = Chain::Emulator.address_at(42);
        let mut tx = transaction();
        assert!(matches!(
            tx.sign_envelope(stranger, 0, &EchoSigner),
            Err(TransactionError::UnknownSigner(addr)) if addr == stranger
        ));
    }

    #[test]
    fn signer_errors_propagate() {
        let (proposer, ..) = addresses();
        let mut tx = transaction();
        assert!(matches!(
            tx.sign_payload(proposer, 0, &FailingSigner),
            Err(TransactionError::Signer(_))
        ));
        assert!(tx.payload_signatures.is_empty());
    }

    #[test]
    fn payload_signatures_are_sorted() {
        let (proposer, payer, authorizer) = addresses();
        let mut tx = transaction();
        tx.sign_payload(authorizer, 0, &EchoSigner).unwrap();
        tx.sign_payload(proposer, 1, &EchoSigner).unwrap();
        tx.sign_payload(proposer, 0, &EchoSigner).unwrap();
        let order: Vec<_> =
            tx.payload_signatures.iter().map(|sig| (sig.signer_index, sig.key_index)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (2, 0)]);

        tx.sign_envelope(payer, 0, &EchoSigner).unwrap();
        assert_eq!(tx.envelope_signatures[0].signer_index, 1);
    }

    #[test]
    fn envelope_covers_payload_signatures() {
        let (proposer, ..) = addresses();
        let mut tx = transaction();
        let unsigned = tx.envelope_message();
        let payload = tx.payload_message();
        tx.sign_payload(proposer, 0, &EchoSigner).unwrap();

        assert_eq!(tx.payload_signatures[0].signature.as_ref(), payload.as_slice());
        assert_eq!(tx.payload_message(), payload);
        assert_ne!(tx.envelope_message(), unsigned);
        assert!(tx.envelope_message().starts_with(&TRANSACTION_DOMAIN_TAG));
    }

    #[test]
    fn id_depends_on_signatures() {
        let (_, payer, _) = addresses();
        let mut tx = transaction();
        let unsigned = tx.id();
        assert_eq!(unsigned, transaction().id());
        tx.sign_envelope(payer, 0, &EchoSigner).unwrap();
        assert_ne!(tx.id(), unsigned);
    }

    #[test]
    fn arguments_are_json_cdc() {
        let tx = Transaction::new().with_argument(&Value::UInt64(7));
        assert_eq!(tx.arguments[0].as_ref(), br#"{"type":"UInt64","value":"7"}"#);
        assert_eq!(tx.gas_limit, DEFAULT_GAS_LIMIT);
    }
}
