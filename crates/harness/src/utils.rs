//! Fixture and value helpers

use crate::error::SetupError;
use flow_harness_primitives::{UFix64, Value};
use std::path::Path;

/// Reads a fixture file.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, SetupError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| SetupError::ReadFile { path: path.to_path_buf(), source })
}

/// Parses a decimal literal with up to 8 fractional digits into a `UFix64` value.
pub fn ufix64(literal: &str) -> Result<Value, SetupError> {
    literal
        .parse::<UFix64>()
        .map(Value::UFix64)
        .map_err(|source| SetupError::InvalidFixedPoint { literal: literal.to_string(), source })
}

/// Converts bytes into an array of `UInt8` values.
///
/// [`Value::to_bytes`] converts back.
pub fn bytes_to_array(bytes: &[u8]) -> Value {
    Value::from_bytes(bytes)
}
