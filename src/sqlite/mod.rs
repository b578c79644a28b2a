//! SQLite-backed implementations of the core storage traits.
//!
//! All three share one [`sqlx::SqlitePool`] and the schema created by
//! [`crate::migrate::migrate_pool`]. Timestamps are stored as RFC 3339 text
//! with microsecond precision and a `Z` suffix, so lexical order equals
//! chronological order.

mod conversations;
mod documents;
mod vectors;

pub use conversations::SqliteConversationStore;
pub use documents::SqliteDocumentStore;
pub use vectors::SqliteVectorIndex;

use chrono::{DateTime, SecondsFormat, Utc};
use docqa_core::RagError;

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, RagError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RagError::database("decode_timestamp", format!("'{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip_and_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 11, 20, 17, 30, 5).unwrap();
        assert_eq!(parse_ts(&format_ts(&early)).unwrap(), early);
        assert!(format_ts(&early) < format_ts(&late));
    }

    #[test]
    fn garbage_timestamp_is_a_database_error() {
        let err = parse_ts("yesterday").unwrap_err();
        assert_eq!(err.tag(), "database_error");
    }
}
