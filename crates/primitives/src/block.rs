use crate::{Identifier, sha3_256};
use alloy_rlp::RlpEncodable;
use serde::{Deserialize, Serialize};

/// A sealed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block id, derived from the header fields.
    pub id: Identifier,
    /// Id of the parent block, zero for genesis.
    pub parent_id: Identifier,
    /// Height, starting at zero for genesis.
    pub height: u64,
    /// Seconds since the unix epoch.
    pub timestamp: u64,
    /// Transactions sealed in this block, in execution order.
    pub transaction_ids: Vec<Identifier>,
}

impl Block {
    /// Creates a block and computes its id.
    pub fn new(
        parent_id: Identifier,
        height: u64,
        timestamp: u64,
        transaction_ids: Vec<Identifier>,
    ) -> Self {
        let header =
            Header { parent_id, height, timestamp, transaction_ids: transaction_ids.clone() };
        let id = sha3_256(alloy_rlp::encode(&header));
        Self { id, parent_id, height, timestamp, transaction_ids }
    }

    /// Creates the genesis block.
    pub fn genesis(timestamp: u64) -> Self {
        Self::new(Identifier::ZERO, 0, timestamp, Vec::new())
    }
}

#[derive(RlpEncodable)]
struct Header {
    parent_id: Identifier,
    height: u64,
    timestamp: u64,
    transaction_ids: Vec<Identifier>,
}
