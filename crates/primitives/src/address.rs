use alloy_primitives::hex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};

/// An 8 byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; Address::LENGTH]);

impl Address {
    /// Number of bytes in an address.
    pub const LENGTH: usize = 8;

    /// The all-zero address, used to mark unset fields.
    pub const EMPTY: Self = Self([0; Self::LENGTH]);

    /// Creates an address from its raw bytes.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice of exactly [`Address::LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseAddressError> {
        let bytes: [u8; Self::LENGTH] =
            bytes.try_into().map_err(|_| ParseAddressError::InvalidLength(bytes.len() * 2))?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Returns `true` if this is the all-zero address.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Hex representation without the `0x` prefix.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    const fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    /// Parses a hex address, with or without `0x`. Short forms such as `0x01` are left-padded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > Self::LENGTH * 2 {
            return Err(ParseAddressError::InvalidLength(digits.len()));
        }
        let padded = format!("{digits:0>16}");
        let mut bytes = [0u8; Self::LENGTH];
        hex::decode_to_slice(padded, &mut bytes)
            .map_err(|_| ParseAddressError::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Errors returned when parsing an [`Address`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseAddressError {
    /// Too many or too few hex digits.
    #[error("invalid address length: expected at most 16 hex digits, got {0}")]
    InvalidLength(usize),
    /// Not valid hex.
    #[error("invalid hex address `{0}`")]
    InvalidHex(String),
}

/// The network an address belongs to.
///
/// Each chain owns a distinct address numbering space, so the same generator index yields
/// different addresses on different chains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Chain {
    /// The local in-process emulator.
    #[default]
    #[display("emulator")]
    Emulator,
    /// The public test network.
    #[display("testnet")]
    Testnet,
}

// === impl Chain ===

impl Chain {
    const fn code_word(self) -> u64 {
        match self {
            Self::Emulator => 0x1cb1_5985_7af0_2018,
            Self::Testnet => 0x6834_ba37_b398_0209,
        }
    }

    /// Returns the address assigned to the account with the given generator index.
    ///
    /// The index bits select rows of the `[64, 45]` code generator matrix, and the sum is
    /// offset by the chain's code word.
    pub const fn address_at(self, index: u64) -> Address {
        let mut word = 0;
        let mut rest = index;
        let mut row = 0;
        while row < LINEAR_CODE_K {
            if rest & 1 == 1 {
                word ^= GENERATOR_MATRIX_ROWS[row];
            }
            rest >>= 1;
            row += 1;
        }
        Address::from_u64(word ^ self.code_word())
    }

    /// Returns the service account address, which always holds index `1`.
    pub const fn service_address(self) -> Address {
        self.address_at(1)
    }

    /// Returns `true` if `address` belongs to this chain's numbering space.
    pub fn contains(self, address: &Address) -> bool {
        self.index_of(address).is_some()
    }

    /// Inverts [`Chain::address_at`], returning `None` for the zero index and for words outside
    /// the code.
    pub fn index_of(self, address: &Address) -> Option<u64> {
        let mut word = u64::from_be_bytes(*address.as_bytes()) ^ self.code_word();
        let mut index = 0;
        while word != 0 {
            let (pivot, rows) = ECHELON_BASIS[63 - word.leading_zeros() as usize];
            if pivot == 0 {
                return None;
            }
            word ^= pivot;
            index ^= rows;
        }
        (index != 0).then_some(index)
    }
}

/// Number of index bits encoded in an address.
const LINEAR_CODE_K: usize = 45;

/// Rows of the generator matrix of the `[64, 45]` address code.
const GENERATOR_MATRIX_ROWS: [u64; LINEAR_CODE_K] = [
    0xe467b9dd11fa00df, 0xf233dcee88fe0abe, 0xf919ee77447b7497, 0xfc8cf73ba23a260d,
    0xfe467b9dd11ee2a1, 0xff233dcee888d807, 0xff919ee774476ce6, 0x7fc8cf73ba231d10,
    0x3fe467b9dd11b183, 0x1ff233dcee8f96d6, 0x8ff919ee774757ba, 0x47fc8cf73ba2b331,
    0x23fe467b9dd27f6c, 0x11ff233dceee8e82, 0x88ff919ee775dd8f, 0x447fc8cf73b905e4,
    0xa23fe467b9de0d83, 0xd11ff233dce8d5a7, 0xe88ff919ee73c38a, 0x7447fc8cf73f171f,
    0xba23fe467b9dcb2b, 0xdd11ff233dcb0cb4, 0xee88ff919ee26c5d, 0x77447fc8cf775dd3,
    0x3ba23fe467b9b5a1, 0x9dd11ff233d9117a, 0xcee88ff919efa640, 0xe77447fc8cf3e297,
    0x73ba23fe467fabd2, 0xb9dd11ff233fb16c, 0xdcee88ff919adde7, 0xee77447fc8ceb196,
    0xf73ba23fe4621cd0, 0x7b9dd11ff2379ac3, 0x3dcee88ff91df46c, 0x9ee77447fc88e702,
    0xcf73ba23fe4131b6, 0x67b9dd11ff240f9a, 0x33dcee88ff90f9e0, 0x19ee77447fcff4e3,
    0x8cf73ba23fe64091, 0x467b9dd11ff115c7, 0x233dcee88ffdb735, 0x919ee77447fe2309,
    0xc8cf73ba23fdc736,
];

/// The generator rows reduced to echelon form, indexed by leading bit.
///
/// Each entry pairs a reduced row with the mask of generator rows that sum to it. Bits that
/// lead no row map to `(0, 0)`.
const ECHELON_BASIS: [(u64, u64); 64] = echelon_basis();

const fn echelon_basis() -> [(u64, u64); 64] {
    let mut basis = [(0u64, 0u64); 64];
    let mut row = 0;
    while row < LINEAR_CODE_K {
        let mut word = GENERATOR_MATRIX_ROWS[row];
        let mut rows = 1u64 << row;
        while word != 0 {
            let lead = 63 - word.leading_zeros() as usize;
            if basis[lead].0 == 0 {
                basis[lead] = (word, rows);
                break;
            }
            word ^= basis[lead].0;
            rows ^= basis[lead].1;
        }
        row += 1;
    }
    basis
}

/// Deterministic, sequential address generator for one [`Chain`].
///
/// The generator starts before the first account. The first call to
/// [`next_address`](Self::next_address) returns the service account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressGenerator {
    chain: Chain,
    index: u64,
}

// === impl AddressGenerator ===

impl AddressGenerator {
    /// Highest index an address can be generated for.
    pub const MAX_INDEX: u64 = (1 << 45) - 1;

    /// Creates a generator positioned before the first account of `chain`.
    pub const fn new(chain: Chain) -> Self {
        Self { chain, index: 0 }
    }

    /// The chain this generator produces addresses for.
    pub const fn chain(&self) -> Chain {
        self.chain
    }

    /// The index of the most recently generated address.
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// Advances the generator and returns the new address.
    ///
    /// Saturates at [`AddressGenerator::MAX_INDEX`].
    pub fn next_address(&mut self) -> Address {
        if self.index < Self::MAX_INDEX {
            self.index += 1;
        }
        self.chain.address_at(self.index)
    }

    /// Returns the address at the current index without advancing.
    pub const fn current_address(&self) -> Address {
        self.chain.address_at(self.index)
    }
}
