//! Serde helpers for message timestamps.
//!
//! Timestamps are written as RFC 3339 strings. Reading also accepts an
//! integer count of milliseconds since the Unix epoch, which is how some
//! clients store `Date` values.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Deserialize)]
#[serde(untagged)]
enum Stamp {
    Text(String),
    Millis(i64),
}

/// Deserialize an RFC 3339 string or epoch milliseconds into an OffsetDateTime.
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    match Stamp::deserialize(deserializer)? {
        Stamp::Text(s) => OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom),
        Stamp::Millis(ms) => OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
            .map_err(serde::de::Error::custom),
    }
}

/// Serialize an OffsetDateTime into an RFC 3339 string.
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::macros::datetime;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "crate::utils::time")]
        at: OffsetDateTime,
    }

    #[test]
    fn writes_rfc3339() {
        let stamped = Stamped {
            at: datetime!(2024-05-01 12:30:00 UTC),
        };
        assert_eq!(
            serde_json::to_string(&stamped).unwrap(),
            r#"{"at":"2024-05-01T12:30:00Z"}"#
        );
    }

    #[test]
    fn reads_fractional_and_offset_forms() {
        let stamped: Stamped = serde_json::from_str(r#"{"at":"2024-05-01T12:30:00.250Z"}"#).unwrap();
        assert_eq!(stamped.at, datetime!(2024-05-01 12:30:00.25 UTC));
        let stamped: Stamped =
            serde_json::from_str(r#"{"at":"2024-05-01T14:30:00+02:00"}"#).unwrap();
        assert_eq!(stamped.at, datetime!(2024-05-01 12:30:00 UTC));
    }

    #[test]
    fn reads_epoch_millis() {
        let stamped: Stamped = serde_json::from_str(r#"{"at":1714566600000}"#).unwrap();
        assert_eq!(stamped.at, datetime!(2024-05-01 12:30:00 UTC));
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Stamped>(r#"{"at":"yesterday"}"#).is_err());
        assert!(serde_json::from_str::<Stamped>(r#"{"at":true}"#).is_err());
    }
}
