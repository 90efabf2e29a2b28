use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};

/// Unsigned 64-bit fixed-point number with 8 decimal places.
///
/// The raw representation is the value scaled by `10^8`, so `1.0` is stored as `100_000_000`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UFix64(u64);

// === impl UFix64 ===

impl UFix64 {
    /// Number of fractional digits.
    pub const DECIMALS: usize = 8;

    /// Raw value of `1.0`.
    pub const SCALE: u64 = 100_000_000;

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Largest representable value, `184467440737.09551615`.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a value from its scaled representation.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the scaled representation.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Creates a value with no fractional part, `None` on overflow.
    pub const fn from_integer(integer: u64) -> Option<Self> {
        match integer.checked_mul(Self::SCALE) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Checked addition.
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Checked subtraction.
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }
}

impl fmt::Display for UFix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

impl fmt::Debug for UFix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for UFix64 {
    type Err = ParseFixedPointError;

    /// Parses a decimal literal such as `10`, `0.5` or `10.00000000`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseFixedPointError::Empty);
        }
        let (integer, fraction) = match s.split_once('.') {
            Some((integer, fraction)) => {
                if fraction.is_empty() {
                    return Err(ParseFixedPointError::InvalidLiteral(s.to_string()));
                }
                (integer, fraction)
            }
            None => (s, ""),
        };
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if integer.is_empty() || !is_digits(integer) || !is_digits(fraction) {
            return Err(ParseFixedPointError::InvalidLiteral(s.to_string()));
        }
        if fraction.len() > Self::DECIMALS {
            return Err(ParseFixedPointError::TooManyDecimals(fraction.len()));
        }

        let integer: u64 = integer.parse().map_err(|_| ParseFixedPointError::Overflow)?;
        let fraction: u64 = if fraction.is_empty() {
            0
        } else {
            format!("{fraction:0<8}").parse().map_err(|_| ParseFixedPointError::Overflow)?
        };

        integer
            .checked_mul(Self::SCALE)
            .and_then(|raw| raw.checked_add(fraction))
            .map(Self)
            .ok_or(ParseFixedPointError::Overflow)
    }
}

impl Serialize for UFix64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UFix64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(de::Error::custom)
    }
}

/// Errors returned when parsing a [`UFix64`] literal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseFixedPointError {
    /// The literal was empty.
    #[error("empty fixed-point literal")]
    Empty,
    /// The literal contained something other than digits and one decimal point.
    #[error("invalid fixed-point literal `{0}`")]
    InvalidLiteral(String),
    /// More than 8 fractional digits.
    #[error("fixed-point literal has {0} decimal places, at most 8 are allowed")]
    TooManyDecimals(usize),
    /// The value does not fit into 64 bits.
    #[error("fixed-point literal out of range")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_precision() {
        let value: UFix64 = "10.00000000".parse().unwrap();
        assert_eq!(value, UFix64::from_integer(10).unwrap());
        assert_eq!(value.raw(), 1_000_000_000);
        assert_eq!(value.to_string(), "10.00000000");
    }

    #[test]
    fn parse_short_forms() {
        assert_eq!("0.5".parse::<UFix64>().unwrap().raw(), 50_000_000);
        assert_eq!("42".parse::<UFix64>().unwrap().raw(), 4_200_000_000);
        assert_eq!("0.00000001".parse::<UFix64>().unwrap().raw(), 1);
        assert_eq!("184467440737.09551615".parse::<UFix64>().unwrap(), UFix64::MAX);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(
            "abc".parse::<UFix64>(),
            Err(ParseFixedPointError::InvalidLiteral("abc".into()))
        );
        assert_eq!("".parse::<UFix64>(), Err(ParseFixedPointError::Empty));
        assert!(matches!("1.".parse::<UFix64>(), Err(ParseFixedPointError::InvalidLiteral(_))));
        assert!(matches!(".5".parse::<UFix64>(), Err(ParseFixedPointError::InvalidLiteral(_))));
        assert!(matches!("-1.0".parse::<UFix64>(), Err(ParseFixedPointError::InvalidLiteral(_))));
        assert!(matches!("1.2.3".parse::<UFix64>(), Err(ParseFixedPointError::InvalidLiteral(_))));
        assert_eq!("1.000000001".parse::<UFix64>(), Err(ParseFixedPointError::TooManyDecimals(9)));
        assert_eq!("184467440737.09551616".parse::<UFix64>(), Err(ParseFixedPointError::Overflow));
    }

    #[test]
    fn checked_arithmetic() {
        let one = UFix64::from_integer(1).unwrap();
        assert_eq!(one.checked_sub(UFix64::from_raw(1)).unwrap().to_string(), "0.99999999");
        assert_eq!(UFix64::ZERO.checked_sub(one), None);
        assert_eq!(UFix64::MAX.checked_add(UFix64::from_raw(1)), None);
    }
}
