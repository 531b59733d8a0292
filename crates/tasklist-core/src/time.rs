use chrono::{SecondsFormat, Utc};

/// Milliseconds since UNIX epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as a sortable ISO-8601 string, e.g. `2024-05-01T09:30:12.345Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Next local id: the clock, or one past the newest id seen when the clock
/// has not moved on (two adds in the same millisecond).
pub fn next_local_id(now_ms: i64, last: Option<i64>) -> i64 {
    match last {
        Some(last) if last >= now_ms => last + 1,
        _ => now_ms,
    }
}
