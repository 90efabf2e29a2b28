//! # flow-harness-config
//!
//! Harness configuration, read from `FLOW_` prefixed environment variables.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Serialized},
    value::{Dict, Map},
};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor},
};
use std::{fmt, time::Duration};
use url::Url;

pub mod error;
pub use error::{EndpointError, ExtractConfigError};

/// Which ledger backend the harness runs against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NetworkType {
    /// An in-process emulator.
    #[default]
    Emulator,
    /// A remote test network reached over HTTP.
    Testnet,
}

impl NetworkType {
    /// Parses a network name. Anything other than exactly `testnet` selects the emulator.
    pub fn from_name(name: &str) -> Self {
        if name == "testnet" { Self::Testnet } else { Self::Emulator }
    }

    /// Returns the canonical name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Emulator => "emulator",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NetworkType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NetworkType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NetworkTypeVisitor)
    }
}

/// Accepts any value: environment values are parsed before extraction, so `1` or `true` arrive
/// as numbers and booleans and select the emulator like any other non-`testnet` value.
struct NetworkTypeVisitor;

impl<'de> Visitor<'de> for NetworkTypeVisitor {
    type Value = NetworkType;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a network name")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(NetworkType::from_name(v))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(NetworkType::Emulator)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(NetworkType::Emulator)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(NetworkType::Emulator)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(NetworkType::Emulator)
    }

    fn visit_char<E: de::Error>(self, _: char) -> Result<Self::Value, E> {
        Ok(NetworkType::Emulator)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(NetworkType::Emulator)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(NetworkType::Emulator)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(NetworkType::Emulator)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(NetworkType::Emulator)
    }
}

/// Harness configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Backend selection, `FLOW_NETWORK_TYPE`.
    pub network_type: NetworkType,
    /// Remote access node endpoint, `FLOW_ADDRESS`.
    pub address: Option<String>,
    /// Hex encoded service account key, `FLOW_SERVICE_ACCOUNT_PRIVATE_KEY`.
    pub service_account_private_key: Option<String>,
    /// Curve of the service account key, `FLOW_SERVICE_ACCOUNT_SIGNATURE_ALGORITHM`.
    ///
    /// One of `ECDSA_P256` or `ECDSA_secp256k1`. Unset means `ECDSA_P256`.
    pub service_account_signature_algorithm: Option<String>,
    /// Hash of the service account key, `FLOW_SERVICE_ACCOUNT_HASH_ALGORITHM`.
    ///
    /// One of `SHA2_256` or `SHA3_256`. Unset means `SHA3_256`.
    pub service_account_hash_algorithm: Option<String>,
    /// Delay between result polls against a remote network, `FLOW_POLL_INTERVAL_MS`.
    pub poll_interval_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            network_type: NetworkType::Emulator,
            address: None,
            service_account_private_key: None,
            service_account_signature_algorithm: None,
            service_account_hash_algorithm: None,
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl HarnessConfig {
    /// Prefix shared by every environment variable read by the harness.
    pub const ENV_PREFIX: &'static str = "FLOW_";

    /// Default delay between result polls.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

    /// Returns the current `HarnessConfig`
    ///
    /// See [`figment`](Self::figment) for more details.
    #[track_caller]
    pub fn load() -> Self {
        Self::from_provider(Self::figment())
    }

    /// Like [`load`](Self::load) but returns an error instead of panicking.
    pub fn try_load() -> Result<Self, ExtractConfigError> {
        Self::try_from(Self::figment())
    }

    /// Extract a `HarnessConfig` from `provider`, panicking if extraction fails.
    ///
    /// # Panics
    ///
    /// If extraction fails, prints an error message indicating the failure and
    /// panics. For a version that doesn't panic, use [`HarnessConfig::try_from()`].
    #[track_caller]
    pub fn from_provider<T: Provider>(provider: T) -> Self {
        trace!("load config with provider: {:?}", provider.metadata());
        Self::try_from(provider).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Attempts to extract a `HarnessConfig` from `provider`, returning the result.
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, ExtractConfigError> {
        Figment::from(provider).extract::<Self>().map_err(ExtractConfigError::new)
    }

    /// The default values overridden by `FLOW_` prefixed environment variables.
    pub fn figment() -> Figment {
        Figment::from(Self::default()).merge(Env::prefixed(Self::ENV_PREFIX))
    }

    /// Sets the network type.
    pub fn with_network_type(mut self, network_type: NetworkType) -> Self {
        self.network_type = network_type;
        self
    }

    /// Sets the remote endpoint.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the service account key.
    pub fn with_service_account_private_key(mut self, key: impl Into<String>) -> Self {
        self.service_account_private_key = Some(key.into());
        self
    }

    /// Sets the service account key algorithms by name.
    pub fn with_service_account_key_algorithms(
        mut self,
        signature_algorithm: impl Into<String>,
        hash_algorithm: impl Into<String>,
    ) -> Self {
        self.service_account_signature_algorithm = Some(signature_algorithm.into());
        self.service_account_hash_algorithm = Some(hash_algorithm.into());
        self
    }

    /// Sets the poll interval in milliseconds.
    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// The poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The configured service account key, ignoring empty values.
    pub fn service_account_private_key(&self) -> Option<&str> {
        non_empty(self.service_account_private_key.as_deref())
    }

    /// The configured service key curve name, ignoring empty values.
    pub fn service_account_signature_algorithm(&self) -> Option<&str> {
        non_empty(self.service_account_signature_algorithm.as_deref())
    }

    /// The configured service key hash name, ignoring empty values.
    pub fn service_account_hash_algorithm(&self) -> Option<&str> {
        non_empty(self.service_account_hash_algorithm.as_deref())
    }

    /// Parses the configured remote endpoint.
    ///
    /// A bare `host:port` is treated as `http://host:port`.
    pub fn endpoint(&self) -> Result<Url, EndpointError> {
        let address = non_empty(self.address.as_deref()).ok_or(EndpointError::Missing)?;
        let with_scheme =
            if address.contains("://") { address.to_string() } else { format!("http://{address}") };
        Url::parse(&with_scheme)
            .map_err(|error| EndpointError::Invalid { address: address.to_string(), error })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl Provider for HarnessConfig {
    fn metadata(&self) -> Metadata {
        Metadata::named("Harness Config")
    }

    #[track_caller]
    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
