use chrono::{DateTime, SecondsFormat, Utc};

/// Millisecond UTC instant with `:` and `.` replaced by `-`
/// (`2025-03-04T05:06:07.089Z` becomes `2025-03-04T05-06-07-089Z`)
pub fn upload_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true).replace([':', '.'], "-")
}

/// `<user>-<label>-<timestamp>.<ext>`
pub fn object_name(user_id: &str, label: &str, timestamp: &str, extension: &str) -> String {
    format!("{}-{}-{}.{}", user_id, label, timestamp, extension)
}

/// Objects are stored under a per-user prefix
pub fn object_path(user_id: &str, name: &str) -> String {
    format!("{}/{}", user_id, name)
}
