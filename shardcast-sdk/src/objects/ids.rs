//! Snowflake identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 64-bit platform identifier.
///
/// Serialized as a decimal string, which is how the gateway sends ids.
/// Deserialization also accepts a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(pub u64);

/// Error returned when a string is not a valid snowflake.
#[derive(Debug, thiserror::Error)]
#[error("invalid snowflake: {0}")]
pub struct SnowflakeParseError(String);

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError(s.to_string()))
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Snowflake(value)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(v) => Ok(Snowflake(v)),
            Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_accepts_string_and_integer() {
        let from_str: Snowflake = serde_json::from_str("\"175928847299117063\"").unwrap();
        let from_int: Snowflake = serde_json::from_str("175928847299117063").unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(
            serde_json::to_string(&from_str).unwrap(),
            "\"175928847299117063\""
        );
    }

    #[test]
    fn test_snowflake_rejects_garbage() {
        assert!(serde_json::from_str::<Snowflake>("\"not-an-id\"").is_err());
        assert!("12a".parse::<Snowflake>().is_err());
    }
}
