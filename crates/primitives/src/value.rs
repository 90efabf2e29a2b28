//! Runtime values and their JSON-Cadence (JSON-CDC) interchange encoding.

use crate::{Address, ParseAddressError, ParseFixedPointError, UFix64};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Value as Json, json};
use std::fmt;

/// A value passed to, or returned from, the ledger runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Value {
    /// The unit value.
    #[default]
    Void,
    /// An optional value.
    Optional(Option<Box<Value>>),
    /// A boolean.
    Bool(bool),
    /// A UTF-8 string.
    String(String),
    /// An account address.
    Address(Address),
    /// An unsigned 8-bit integer.
    UInt8(u8),
    /// An unsigned 64-bit integer.
    UInt64(u64),
    /// An unsigned fixed-point number.
    UFix64(UFix64),
    /// A variable-sized array.
    Array(Vec<Value>),
    /// An emitted event.
    Event(Composite),
}

/// A named composite with ordered fields, used for events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Composite {
    /// Fully qualified type id, e.g. `flow.AccountCreated`.
    pub id: String,
    /// Field names and values in declaration order.
    pub fields: Vec<(String, Value)>,
}

impl Composite {
    /// Creates a composite with the given type id and fields.
    pub fn new(id: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self { id: id.into(), fields }
    }

    /// Returns the value of the field called `name`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, value)| value)
    }
}

// === impl Value ===

impl Value {
    /// Wraps a byte sequence as an array of `UInt8` values, preserving order and length.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::Array(bytes.iter().copied().map(Self::UInt8).collect())
    }

    /// Inverse of [`Value::from_bytes`]. Returns `None` unless this is an array of `UInt8`.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Array(values) => values
                .iter()
                .map(|value| match value {
                    Self::UInt8(byte) => Some(*byte),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// Returns the fixed-point number, if this is one.
    pub fn as_ufix64(&self) -> Option<UFix64> {
        match self {
            Self::UFix64(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the address, if this is one.
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(address) => Some(*address),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is an unsigned integer of any width.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt8(value) => Some(u64::from(*value)),
            Self::UInt64(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the event composite, if this is an event.
    pub fn as_event(&self) -> Option<&Composite> {
        match self {
            Self::Event(composite) => Some(composite),
            _ => None,
        }
    }

    /// Name of this value's type in the JSON-CDC encoding.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Void => "Void",
            Self::Optional(_) => "Optional",
            Self::Bool(_) => "Bool",
            Self::String(_) => "String",
            Self::Address(_) => "Address",
            Self::UInt8(_) => "UInt8",
            Self::UInt64(_) => "UInt64",
            Self::UFix64(_) => "UFix64",
            Self::Array(_) => "Array",
            Self::Event(_) => "Event",
        }
    }

    /// Converts this value into its JSON-CDC tree.
    pub fn to_json(&self) -> Json {
        let ty = self.type_name();
        match self {
            Self::Void => json!({ "type": ty }),
            Self::Optional(inner) => {
                json!({ "type": ty, "value": inner.as_ref().map(|value| value.to_json()) })
            }
            Self::Bool(value) => json!({ "type": ty, "value": value }),
            Self::String(value) => json!({ "type": ty, "value": value }),
            Self::Address(address) => json!({ "type": ty, "value": address.to_string() }),
            Self::UInt8(value) => json!({ "type": ty, "value": value.to_string() }),
            Self::UInt64(value) => json!({ "type": ty, "value": value.to_string() }),
            Self::UFix64(value) => json!({ "type": ty, "value": value.to_string() }),
            Self::Array(values) => {
                json!({ "type": ty, "value": values.iter().map(Self::to_json).collect::<Vec<_>>() })
            }
            Self::Event(composite) => {
                let fields = composite
                    .fields
                    .iter()
                    .map(|(name, value)| json!({ "name": name, "value": value.to_json() }))
                    .collect::<Vec<_>>();
                json!({ "type": ty, "value": { "id": composite.id, "fields": fields } })
            }
        }
    }

    /// Parses a JSON-CDC tree.
    pub fn from_json(json: &Json) -> Result<Self, ValueError> {
        let ty = json.get("type").and_then(Json::as_str).ok_or(ValueError::MissingType)?;
        let value = json.get("value").unwrap_or(&Json::Null);
        let string = || value.as_str().ok_or_else(|| ValueError::malformed(ty));

        let decoded = match ty {
            "Void" => Self::Void,
            "Optional" => match value {
                Json::Null => Self::Optional(None),
                inner => Self::Optional(Some(Box::new(Self::from_json(inner)?))),
            },
            "Bool" => Self::Bool(value.as_bool().ok_or_else(|| ValueError::malformed(ty))?),
            "String" => Self::String(string()?.to_string()),
            "Address" => Self::Address(string()?.parse()?),
            "UInt8" => Self::UInt8(string()?.parse().map_err(|_| ValueError::malformed(ty))?),
            "UInt64" => Self::UInt64(string()?.parse().map_err(|_| ValueError::malformed(ty))?),
            "UFix64" => Self::UFix64(string()?.parse()?),
            "Array" => Self::Array(
                value
                    .as_array()
                    .ok_or_else(|| ValueError::malformed(ty))?
                    .iter()
                    .map(Self::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            "Event" => {
                let id = value
                    .get("id")
                    .and_then(Json::as_str)
                    .ok_or_else(|| ValueError::malformed(ty))?;
                let fields = value
                    .get("fields")
                    .and_then(Json::as_array)
                    .ok_or_else(|| ValueError::malformed(ty))?
                    .iter()
                    .map(|field| {
                        let name = field
                            .get("name")
                            .and_then(Json::as_str)
                            .ok_or_else(|| ValueError::malformed(ty))?;
                        let value = field.get("value").ok_or_else(|| ValueError::malformed(ty))?;
                        Ok((name.to_string(), Self::from_json(value)?))
                    })
                    .collect::<Result<_, ValueError>>()?;
                Self::Event(Composite::new(id, fields))
            }
            other => return Err(ValueError::UnsupportedType(other.to_string())),
        };
        Ok(decoded)
    }

    /// Encodes this value as JSON-CDC bytes.
    pub fn encode(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Decodes JSON-CDC bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ValueError> {
        let json: Json = serde_json::from_slice(bytes)?;
        Self::from_json(&json)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("()"),
            Self::Optional(None) => f.write_str("nil"),
            Self::Optional(Some(value)) => value.fmt(f),
            Self::Bool(value) => value.fmt(f),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Address(address) => address.fmt(f),
            Self::UInt8(value) => value.fmt(f),
            Self::UInt64(value) => value.fmt(f),
            Self::UFix64(value) => value.fmt(f),
            Self::Array(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    value.fmt(f)?;
                }
                f.write_str("]")
            }
            Self::Event(composite) => {
                write!(f, "{}(", composite.id)?;
                for (i, (name, value)) in composite.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Self::from_json(&json).map_err(de::Error::custom)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::UInt8(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::UInt64(value)
    }
}

impl From<UFix64> for Value {
    fn from(value: UFix64) -> Self {
        Self::UFix64(value)
    }
}

impl From<Address> for Value {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::Array(values)
    }
}

/// Errors returned when decoding a JSON-CDC value.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    /// Not valid JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The `type` key is missing or not a string.
    #[error("missing `type` in encoded value")]
    MissingType,
    /// The type is not supported by this runtime.
    #[error("unsupported value type `{0}`")]
    UnsupportedType(String),
    /// The `value` does not match the declared type.
    #[error("malformed `{0}` value")]
    Malformed(String),
    /// An address literal failed to parse.
    #[error(transparent)]
    Address(#[from] ParseAddressError),
    /// A fixed-point literal failed to parse.
    #[error(transparent)]
    FixedPoint(#[from] ParseFixedPointError),
}

impl ValueError {
    fn malformed(ty: &str) -> Self {
        Self::Malformed(ty.to_string())
    }
}
