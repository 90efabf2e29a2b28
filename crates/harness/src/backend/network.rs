//! Flow Access REST API client

use super::{Backend, BackendError};
use alloy_primitives::hex;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use flow_harness_primitives::{
    Address, Block, Event, ExecutionError, Identifier, ParseAddressError, ScriptResult,
    Transaction, TransactionResult, TransactionSignature, Value, ValueError,
};
use parking_lot::Mutex;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::VecDeque, fmt, str::FromStr, thread, time::Duration};
use url::Url;

/// Errors talking to an access node.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Transport failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The request url could not be built.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// The node answered with an error status.
    #[error("access node returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },
    /// A response field could not be decoded.
    #[error("malformed {field} in response: {reason}")]
    Malformed {
        /// The field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// A value payload could not be decoded.
    #[error(transparent)]
    Value(#[from] ValueError),
    /// An address could not be parsed.
    #[error(transparent)]
    Address(#[from] ParseAddressError),
    /// No submitted transaction is waiting for its result.
    #[error("no submitted transaction is awaiting execution")]
    NoPendingTransaction,
    /// The transaction expired before being sealed.
    #[error("transaction {0} expired")]
    Expired(Identifier),
    /// The node returned no sealed block.
    #[error("access node returned no sealed block")]
    NoSealedBlock,
    /// The account has no such key.
    #[error("account {address} has no key with index {key_index}")]
    KeyNotFound {
        /// The account.
        address: Address,
        /// The requested key index.
        key_index: u32,
    },
}

impl NetworkError {
    fn malformed(field: &'static str, reason: impl fmt::Display) -> Self {
        Self::Malformed { field, reason: reason.to_string() }
    }
}

/// A blocking client for a Flow access node.
///
/// Submitted transactions are queued locally; executing the next one polls its result until it
/// is sealed. The network produces blocks on its own, so committing only reads the latest sealed
/// block.
pub struct NetworkBackend {
    client: Client,
    endpoint: Url,
    poll_interval: Duration,
    pending: Mutex<VecDeque<Identifier>>,
}

// === impl NetworkBackend ===

impl NetworkBackend {
    /// Creates a client for the access node at `endpoint`.
    pub fn new(endpoint: Url, poll_interval: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .user_agent(concat!("flow-harness/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint, poll_interval, pending: Default::default() })
    }

    /// The access node url.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Number of submitted transactions whose result has not been fetched.
    pub fn pending_transaction_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Fetches the latest sealed block.
    pub fn latest_block(&self) -> Result<Block, NetworkError> {
        let blocks: Vec<BlockBody> = self.get("v1/blocks?height=sealed")?;
        blocks.into_iter().next().ok_or(NetworkError::NoSealedBlock)?.header.try_into_block()
    }

    /// Sends a signed transaction and returns its id.
    pub fn send_transaction(&self, tx: &Transaction) -> Result<Identifier, NetworkError> {
        let response: SubmittedTransaction =
            self.post("v1/transactions", &TransactionBody::from(tx))?;
        parse_identifier("id", &response.id)
    }

    /// Polls the result of a transaction until it is sealed.
    pub fn wait_for_seal(&self, id: Identifier) -> Result<TransactionResult, NetworkError> {
        let path = format!("v1/transaction_results/{}", hex::encode(id));
        loop {
            let body: TransactionResultBody = self.get(&path)?;
            match body.status {
                TransactionStatus::Sealed => return body.try_into_result(id),
                TransactionStatus::Expired => return Err(NetworkError::Expired(id)),
                status => {
                    trace!(target: "harness::network", %id, ?status, "waiting for seal");
                    thread::sleep(self.poll_interval);
                }
            }
        }
    }

    /// Runs a script against the latest sealed block.
    pub fn run_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptResult, NetworkError> {
        let body = ScriptBody {
            script: STANDARD.encode(script),
            arguments: arguments.iter().map(|arg| STANDARD.encode(arg)).collect(),
        };
        let url = self.endpoint.join("v1/scripts?block_height=sealed")?;
        let response = self.client.post(url).json(&body).send()?;

        // a script that fails to run is reported as a bad request
        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            let error: ApiError = response.json()?;
            debug!(target: "harness::network", message = %error.message, "script failed");
            return Ok(ScriptResult::failure(parse_execution_error(&error.message)));
        }
        let encoded: String = decode_response(response)?;
        let payload =
            STANDARD.decode(encoded).map_err(|err| NetworkError::malformed("value", err))?;
        Ok(ScriptResult::success(Value::decode(&payload)?))
    }

    /// Fetches the current sequence number of an account key.
    pub fn get_sequence_number(
        &self,
        address: &Address,
        key_index: u32,
    ) -> Result<u64, NetworkError> {
        let account: AccountBody = self.get(&format!("v1/accounts/{}?expand=keys", address.hex()))?;
        account
            .keys
            .iter()
            .find(|key| key.index == key_index)
            .map(|key| key.sequence_number)
            .ok_or(NetworkError::KeyNotFound { address: *address, key_index })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetworkError> {
        let url = self.endpoint.join(path)?;
        trace!(target: "harness::network", %url, "GET");
        decode_response(self.client.get(url).send()?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, NetworkError> {
        let url = self.endpoint.join(path)?;
        trace!(target: "harness::network", %url, "POST");
        decode_response(self.client.post(url).json(body).send()?)
    }
}

impl fmt::Debug for NetworkBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkBackend")
            .field("endpoint", &self.endpoint.as_str())
            .field("poll_interval", &self.poll_interval)
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

impl Backend for NetworkBackend {
    fn latest_block_id(&self) -> Result<Identifier, BackendError> {
        Ok(self.latest_block()?.id)
    }

    fn add_transaction(&self, tx: &Transaction) -> Result<(), BackendError> {
        let id = self.send_transaction(tx)?;
        debug!(target: "harness::network", %id, "sent transaction");
        self.pending.lock().push_back(id);
        Ok(())
    }

    fn execute_next_transaction(&self) -> Result<TransactionResult, BackendError> {
        let id = self.pending.lock().pop_front().ok_or(NetworkError::NoPendingTransaction)?;
        Ok(self.wait_for_seal(id)?)
    }

    fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptResult, BackendError> {
        Ok(self.run_script(script, arguments)?)
    }

    fn commit_block(&self) -> Result<Block, BackendError> {
        Ok(self.latest_block()?)
    }

    fn sequence_number(&self, address: &Address, key_index: u32) -> Result<u64, BackendError> {
        Ok(self.get_sequence_number(address, key_index)?)
    }
}

fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, NetworkError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.json::<ApiError>().map(|err| err.message).unwrap_or_default();
        return Err(NetworkError::Status { status: status.as_u16(), message });
    }
    Ok(response.json()?)
}

fn parse_identifier(field: &'static str, s: &str) -> Result<Identifier, NetworkError> {
    Identifier::from_str(s).map_err(|err| NetworkError::malformed(field, err))
}

/// Splits an `[Error Code: N] message` string into an [`ExecutionError`].
///
/// Messages without a code are runtime errors.
fn parse_execution_error(message: &str) -> ExecutionError {
    let code = message
        .find("[Error Code: ")
        .map(|start| &message[start + "[Error Code: ".len()..])
        .and_then(|rest| rest.split_once(']'))
        .and_then(|(code, rest)| Some((code.trim().parse::<u16>().ok()?, rest.trim())));
    match code {
        Some((code, rest)) => ExecutionError::new(code, rest),
        None => ExecutionError::runtime(message.trim()),
    }
}

/// Integers travel as decimal strings.
mod quoted {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::{fmt::Display, str::FromStr};

    pub(super) fn serialize<T: Display, S: Serializer>(
        value: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub(super) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct BlockBody {
    header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    id: String,
    parent_id: String,
    #[serde(with = "quoted")]
    height: u64,
    timestamp: String,
}

impl BlockHeader {
    fn try_into_block(self) -> Result<Block, NetworkError> {
        let timestamp = chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|err| NetworkError::malformed("timestamp", err))?;
        Ok(Block {
            id: parse_identifier("id", &self.id)?,
            parent_id: parse_identifier("parent_id", &self.parent_id)?,
            height: self.height,
            timestamp: timestamp.timestamp().max(0) as u64,
            transaction_ids: Vec::new(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ProposalKeyBody {
    address: String,
    #[serde(with = "quoted")]
    key_index: u32,
    #[serde(with = "quoted")]
    sequence_number: u64,
}

#[derive(Debug, Serialize)]
struct SignatureBody {
    address: String,
    #[serde(with = "quoted")]
    key_index: u32,
    signature: String,
}

impl From<&TransactionSignature> for SignatureBody {
    fn from(sig: &TransactionSignature) -> Self {
        Self {
            address: sig.address.hex(),
            key_index: sig.key_index,
            signature: STANDARD.encode(&sig.signature),
        }
    }
}

#[derive(Debug, Serialize)]
struct TransactionBody {
    script: String,
    arguments: Vec<String>,
    reference_block_id: String,
    #[serde(with = "quoted")]
    gas_limit: u64,
    payer: String,
    proposal_key: ProposalKeyBody,
    authorizers: Vec<String>,
    payload_signatures: Vec<SignatureBody>,
    envelope_signatures: Vec<SignatureBody>,
}

impl From<&Transaction> for TransactionBody {
    fn from(tx: &Transaction) -> Self {
        Self {
            script: STANDARD.encode(&tx.script),
            arguments: tx.arguments.iter().map(|arg| STANDARD.encode(arg)).collect(),
            reference_block_id: hex::encode(tx.reference_block_id),
            gas_limit: tx.gas_limit,
            payer: tx.payer.hex(),
            proposal_key: ProposalKeyBody {
                address: tx.proposal_key.address.hex(),
                key_index: tx.proposal_key.key_index,
                sequence_number: tx.proposal_key.sequence_number,
            },
            authorizers: tx.authorizers.iter().map(Address::hex).collect(),
            payload_signatures: tx.payload_signatures.iter().map(Into::into).collect(),
            envelope_signatures: tx.envelope_signatures.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmittedTransaction {
    id: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
enum TransactionStatus {
    #[default]
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct EventBody {
    #[serde(rename = "type")]
    event_type: String,
    transaction_id: String,
    #[serde(with = "quoted")]
    transaction_index: u32,
    #[serde(with = "quoted")]
    event_index: u32,
    payload: String,
}

impl EventBody {
    fn try_into_event(self) -> Result<Event, NetworkError> {
        let payload =
            STANDARD.decode(&self.payload).map_err(|err| NetworkError::malformed("payload", err))?;
        Ok(Event {
            event_type: self.event_type,
            transaction_id: parse_identifier("transaction_id", &self.transaction_id)?,
            transaction_index: self.transaction_index,
            event_index: self.event_index,
            value: Value::decode(&payload)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TransactionResultBody {
    #[serde(default)]
    status: TransactionStatus,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    events: Vec<EventBody>,
}

impl TransactionResultBody {
    fn try_into_result(self, id: Identifier) -> Result<TransactionResult, NetworkError> {
        if !self.error_message.is_empty() {
            return Ok(TransactionResult::reverted_with(
                id,
                parse_execution_error(&self.error_message),
            ));
        }
        let events =
            self.events.into_iter().map(EventBody::try_into_event).collect::<Result<_, _>>()?;
        Ok(TransactionResult::success(id, events))
    }
}

#[derive(Debug, Serialize)]
struct ScriptBody {
    script: String,
    arguments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AccountBody {
    #[serde(default)]
    keys: Vec<AccountKeyBody>,
}

#[derive(Debug, Deserialize)]
struct AccountKeyBody {
    #[serde(with = "quoted")]
    index: u32,
    #[serde(with = "quoted")]
    sequence_number: u64,
}
