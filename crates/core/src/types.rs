use std::time::Duration;

/// Jobs are keyed by time-ordered UUIDs (v7).
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Add a std [`Duration`] to a timestamp, saturating at the maximum
/// representable instant instead of overflowing.
pub fn offset(ts: Timestamp, by: Duration) -> Timestamp {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|d| ts.checked_add_signed(d))
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_adds_duration() {
        let now = chrono::Utc::now();
        assert_eq!(offset(now, Duration::from_secs(60)) - now, chrono::Duration::seconds(60));
    }

    #[test]
    fn offset_saturates() {
        let now = chrono::Utc::now();
        assert_eq!(
            offset(now, Duration::from_secs(u64::MAX)),
            chrono::DateTime::<chrono::Utc>::MAX_UTC
        );
    }
}
