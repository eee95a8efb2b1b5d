//! Timestamp value object for message times.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Immutable point in time, always UTC.
///
/// Chat servers send times in several shapes; deserialization accepts
/// RFC 3339 strings, zone-less ISO local date-times (taken as UTC) and
/// epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Creates a timestamp from Unix milliseconds.
    ///
    /// Returns `None` for values outside chrono's representable range.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Returns the timestamp as Unix milliseconds.
    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Parses the textual forms accepted on the wire.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Self(naive.and_utc()));
        }
        raw.parse::<i64>().ok().and_then(Self::from_unix_millis)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Millis(millis) => Timestamp::from_unix_millis(millis).ok_or_else(|| {
                serde::de::Error::custom(format!("timestamp out of range: {}", millis))
            }),
            RawTimestamp::Text(text) => Timestamp::parse(&text).ok_or_else(|| {
                serde::de::Error::custom(format!("unrecognized timestamp: {}", text))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn deserializes_rfc3339() {
        let ts: Timestamp = serde_json::from_str("\"2024-01-15T10:30:00Z\"").unwrap();
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_datetime().hour(), 10);
    }

    #[test]
    fn deserializes_local_date_time_as_utc() {
        let ts: Timestamp = serde_json::from_str("\"2024-01-15T10:30:00.123456\"").unwrap();
        assert_eq!(ts.as_datetime().minute(), 30);
        assert_eq!(ts.as_datetime().day(), 15);
    }

    #[test]
    fn deserializes_epoch_millis() {
        let ts: Timestamp = serde_json::from_str("1705314600000").unwrap();
        assert_eq!(ts.as_unix_millis(), 1_705_314_600_000);
    }

    #[test]
    fn rejects_garbage() {
        let result: Result<Timestamp, _> = serde_json::from_str("\"yesterday\"");
        assert!(result.is_err());
    }

    #[test]
    fn serializes_as_rfc3339() {
        let ts = Timestamp::from_unix_millis(1_705_314_600_000).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-15T10:30:00"));
    }

    #[test]
    fn ordering_follows_time() {
        let earlier = Timestamp::from_unix_millis(1_000).unwrap();
        let later = Timestamp::from_unix_millis(2_000).unwrap();
        assert!(earlier < later);
    }
}
