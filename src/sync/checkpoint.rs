//! Sync checkpoint.
//!
//! Stored as `YYYY-MM-DD HH:MM:SS` in local time. Comparison against memo
//! timestamps happens in unix seconds.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use tracing::warn;

pub const CHECKPOINT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Last successful sync time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(DateTime<FixedOffset>);

impl Checkpoint {
    /// Parse a stored checkpoint in the given offset.
    #[must_use]
    pub fn parse(raw: &str, offset: FixedOffset) -> Option<Self> {
        NaiveDateTime::parse_from_str(raw.trim(), CHECKPOINT_FORMAT)
            .ok()?
            .and_local_timezone(offset)
            .single()
            .map(Self)
    }

    /// Parse a stored checkpoint, falling back to `now` when it is invalid.
    ///
    /// Falling back to `now` means nothing older is re-synced.
    #[must_use]
    pub fn parse_or_now(raw: &str, now: DateTime<FixedOffset>) -> Self {
        Self::parse(raw, *now.offset()).unwrap_or_else(|| {
            warn!(raw, "Invalid lastSyncTime, using current time");
            Self(now)
        })
    }

    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    /// The checkpoint after a successful run at `now`; never moves backwards.
    #[must_use]
    pub fn advance(self, now: DateTime<FixedOffset>) -> Self {
        self.max(Self(now))
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(CHECKPOINT_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_parse_and_format() {
        let cp = Checkpoint::parse("2024-01-01 00:00:00", utc()).unwrap();
        assert_eq!(cp.timestamp(), 1_704_067_200);
        assert_eq!(cp.to_string(), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_parse_respects_offset() {
        let plus_two = FixedOffset::east_opt(7200).unwrap();
        let cp = Checkpoint::parse("2024-01-01 02:00:00", plus_two).unwrap();
        assert_eq!(cp.timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_invalid_falls_back_to_now() {
        let now = utc().with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let cp = Checkpoint::parse_or_now("yesterday", now);
        assert_eq!(cp.timestamp(), now.timestamp());
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let now = utc().with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let future = Checkpoint::parse("2030-01-01 00:00:00", utc()).unwrap();
        assert_eq!(future.advance(now), future);

        let past = Checkpoint::parse("2000-01-01 00:00:00", utc()).unwrap();
        assert_eq!(past.advance(now).to_string(), "2024-05-01 12:00:00");
    }
}
