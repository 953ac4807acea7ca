use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A UTC instant attached to every block.
///
/// On disk a timestamp is an RFC 3339 string carrying exactly as many
/// fractional digits as the value needs, so parsing it back yields the same
/// instant. For hashing, [`Timestamp::canonical_bytes`] gives a fixed-width
/// encoding that does not depend on string formatting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time, truncated to millisecond precision.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }

    /// Build from milliseconds since the UNIX epoch.
    pub fn from_unix_millis(ms: i64) -> Result<Self, TypeError> {
        DateTime::from_timestamp_millis(ms)
            .map(Self)
            .ok_or_else(|| TypeError::InvalidTimestamp(format!("{ms}ms is out of range")))
    }

    /// Wrap an existing UTC datetime.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// The underlying datetime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Milliseconds since the UNIX epoch.
    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Fixed-width encoding: seconds (i64 BE) followed by sub-second nanos (u32 BE).
    pub fn canonical_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..8].copy_from_slice(&self.0.timestamp().to_be_bytes());
        out[8..].copy_from_slice(&self.0.timestamp_subsec_nanos().to_be_bytes());
        out
    }

    /// RFC 3339 representation in UTC (`Z` suffix).
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Parse an RFC 3339 string, normalising to UTC.
    pub fn parse_rfc3339(s: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_rfc3339(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_rfc3339(&s).map_err(serde::de::Error::custom)
    }
}
