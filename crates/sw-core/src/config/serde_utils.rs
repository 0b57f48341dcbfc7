//! Serde helpers for configuration durations
//!
//! Durations appear in config files as plain integers: seconds for the
//! coarse intervals, milliseconds for the sub-second ones.

/// Serialize/deserialize a `Duration` as whole seconds
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serialize/deserialize a `Duration` as whole milliseconds
pub mod duration_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Mixed {
        #[serde(with = "super::duration_secs")]
        coarse: Duration,
        #[serde(with = "super::duration_millis")]
        fine: Duration,
    }

    #[test]
    fn test_mixed_units_roundtrip() {
        let original = Mixed {
            coarse: Duration::from_secs(30),
            fine: Duration::from_millis(100),
        };
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(json, r#"{"coarse":30,"fine":100}"#);

        let parsed: Mixed = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
