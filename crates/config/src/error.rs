//! Configuration errors.

use std::{collections::HashSet, error::Error, fmt};

/// The message shown upon panic if the config could not be extracted from the figment
pub const FAILED_TO_EXTRACT_CONFIG_PANIC_MSG: &str = "failed to extract harness config:";

/// Represents a failed attempt to extract `HarnessConfig` from a `Figment`
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractConfigError {
    /// error thrown when extracting the `HarnessConfig`
    pub(crate) error: figment::Error,
}

impl ExtractConfigError {
    /// Wraps the figment error
    pub fn new(error: figment::Error) -> Self {
        Self { error }
    }
}

impl fmt::Display for ExtractConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut unique = HashSet::with_capacity(self.error.count());
        writeln!(f, "{FAILED_TO_EXTRACT_CONFIG_PANIC_MSG}")?;
        for err in self.error.clone() {
            let mut line = err.to_string();
            if !err.path.is_empty() {
                // the path is the setting name, e.g. `["poll_interval_ms"]`
                line.push_str(&format!(" for setting `{}`", err.path.join(".")));
            }
            if unique.insert(line.clone()) {
                writeln!(f, "{line}")?;
            }
        }
        Ok(())
    }
}

impl Error for ExtractConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Error::source(&self.error)
    }
}

/// Errors returned when resolving the remote network endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndpointError {
    /// `FLOW_ADDRESS` was not set.
    Missing,
    /// `FLOW_ADDRESS` is not a valid URL.
    Invalid {
        /// The configured value.
        address: String,
        /// Why parsing failed.
        error: url::ParseError,
    },
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("no network address configured, set `FLOW_ADDRESS`"),
            Self::Invalid { address, error } => {
                write!(f, "invalid network address `{address}`: {error}")
            }
        }
    }
}

impl Error for EndpointError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Missing => None,
            Self::Invalid { error, .. } => Some(error),
        }
    }
}
