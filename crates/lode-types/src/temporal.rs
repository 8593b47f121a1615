use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in whole seconds.
///
/// Mod-time queries return `Option<Timestamp>`, where `None` means the file
/// does not exist. `None` orders below every `Some`, so "absent" always
/// compares as older than any real time.
pub type Timestamp = i64;

/// The current wall-clock time in unix seconds.
pub fn now() -> Timestamp {
    to_timestamp(SystemTime::now())
}

/// Convert a `SystemTime` to unix seconds, saturating pre-epoch times to 0.
pub fn to_timestamp(time: SystemTime) -> Timestamp {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as Timestamp)
        .unwrap_or_default()
}
