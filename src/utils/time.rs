//! Timestamp helpers.
//!
//! The module doubles as a `#[serde(with = "crate::utils::time")]` adapter that
//! writes [`OffsetDateTime`] values as RFC 3339 strings.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current wall-clock time in UTC.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Milliseconds since the unix epoch, clamped to zero for earlier instants.
pub fn unix_millis(datetime: OffsetDateTime) -> u64 {
    let millis = datetime.unix_timestamp_nanos() / 1_000_000;
    u64::try_from(millis).unwrap_or(0)
}

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
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
    use super::*;
    use time::macros::datetime;

    #[test]
    fn millis_since_epoch() {
        assert_eq!(unix_millis(datetime!(1970-01-01 00:00:01.5 UTC)), 1500);
        assert_eq!(unix_millis(datetime!(1969-12-31 23:59:59 UTC)), 0);
    }
}
