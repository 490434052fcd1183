//! Microsecond-precision timestamp type
//!
//! Timestamps back the `Time` key type and the automatic `created_at` /
//! `updated_at` keys. They are stored as microseconds since Unix epoch
//! (1970-01-01 00:00:00 UTC).
//!
//! ## Usage
//!
//! ```
//! use docmap_core::Timestamp;
//!
//! let now = Timestamp::now();
//! let from_secs = Timestamp::from_secs(1000);
//! let parsed = Timestamp::parse_rfc3339("2009-06-01T12:00:00Z").unwrap();
//! assert!(parsed.is_after(from_secs));
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Microsecond-precision timestamp
///
/// ## Invariants
///
/// - Timestamps are always non-negative (u64)
/// - Timestamps are always in microseconds
/// - The zero timestamp represents Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Maximum representable timestamp
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch (0) if the system clock is before Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000))
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Parse an RFC 3339 string (`2009-06-01T12:00:00Z`)
    ///
    /// Returns `None` for malformed input or instants before the epoch.
    pub fn parse_rfc3339(s: &str) -> Option<Self> {
        let parsed = DateTime::parse_from_rfc3339(s.trim()).ok()?;
        let micros = parsed.timestamp_micros();
        u64::try_from(micros).ok().map(Timestamp)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get microseconds since Unix epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Get milliseconds since Unix epoch (truncates)
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000
    }

    /// Get seconds since Unix epoch (truncates)
    #[inline]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Convert to a chrono UTC datetime
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let micros = i64::try_from(self.0).unwrap_or(i64::MAX);
        Utc.timestamp_micros(micros)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Render as RFC 3339 with microsecond precision
    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    /// The smallest timestamp strictly after `self`
    pub fn next_tick(&self) -> Self {
        Timestamp(self.0.saturating_add(1))
    }

    /// Check if this timestamp is after another
    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp(u64::try_from(dt.timestamp_micros()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timestamp_epoch() {
        assert_eq!(Timestamp::EPOCH.as_micros(), 0);
        assert_eq!(Timestamp::EPOCH.as_millis(), 0);
        assert_eq!(Timestamp::EPOCH.as_secs(), 0);
    }

    #[test]
    fn test_timestamp_from_millis() {
        let ts = Timestamp::from_millis(5000);
        assert_eq!(ts.as_millis(), 5000);
        assert_eq!(ts.as_micros(), 5_000_000);
        assert_eq!(ts.as_secs(), 5);
    }

    #[test]
    fn test_timestamp_now_advances() {
        let before = Timestamp::now();
        std::thread::sleep(Duration::from_millis(1));
        let after = Timestamp::now();
        assert!(after > before, "Time should advance");
    }

    #[test]
    fn test_timestamp_next_tick() {
        let ts = Timestamp::from_micros(41);
        assert_eq!(ts.next_tick().as_micros(), 42);
        assert_eq!(Timestamp::MAX.next_tick(), Timestamp::MAX);
    }

    #[test]
    fn test_parse_rfc3339() {
        let ts = Timestamp::parse_rfc3339("1970-01-01T00:00:01Z").unwrap();
        assert_eq!(ts, Timestamp::from_secs(1));

        let with_offset = Timestamp::parse_rfc3339("1970-01-01T01:00:01+01:00").unwrap();
        assert_eq!(with_offset, Timestamp::from_secs(1));
    }

    #[test]
    fn test_parse_rfc3339_rejects_garbage_and_pre_epoch() {
        assert!(Timestamp::parse_rfc3339("yesterday").is_none());
        assert!(Timestamp::parse_rfc3339("1969-12-31T23:59:59Z").is_none());
    }

    #[test]
    fn test_rfc3339_display() {
        let ts = Timestamp::from_micros(1_500_000);
        assert_eq!(ts.to_string(), "1970-01-01T00:00:01.500000Z");
        assert_eq!(Timestamp::parse_rfc3339(&ts.to_rfc3339()), Some(ts));
    }

    #[test]
    fn test_timestamp_from_datetime() {
        let dt = Utc.timestamp_opt(10, 0).single().unwrap();
        assert_eq!(Timestamp::from(dt), Timestamp::from_secs(10));
    }
}
