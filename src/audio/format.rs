// Container type helpers
//
// Extension and display-name lookups match on substrings of the MIME type,
// checked in a fixed order. "audio/mpeg" contains none of the keys and
// therefore maps to the generic fallback; callers rely on that.

/// Default negotiation order for capture containers (first supported wins)
pub const DEFAULT_MIME_PREFERENCES: [&str; 3] = ["audio/mp4", "audio/webm", "audio/wav"];

/// MIME type attached to transcoder output
pub const MP3_MIME: &str = "audio/mp3";

/// Extension used when no known container key matches
pub const GENERIC_EXTENSION: &str = "audio";

const EXTENSIONS: [(&str, &str); 4] = [("mp3", "mp3"), ("webm", "webm"), ("mp4", "mp4"), ("wav", "wav")];
const FORMAT_NAMES: [(&str, &str); 4] = [("mp3", "MP3"), ("webm", "WebM"), ("mp4", "MP4"), ("wav", "WAV")];

/// File extension for a MIME type (or file name)
pub fn file_extension(mime_type: &str) -> &'static str {
    EXTENSIONS
        .iter()
        .find(|(key, _)| mime_type.contains(key))
        .map(|(_, ext)| *ext)
        .unwrap_or(GENERIC_EXTENSION)
}

/// Human-readable container name for a MIME type
pub fn format_name(mime_type: &str) -> &'static str {
    FORMAT_NAMES
        .iter()
        .find(|(key, _)| mime_type.contains(key))
        .map(|(_, name)| *name)
        .unwrap_or("Audio")
}

/// Whether the MIME type already denotes MP3 (conversion is skipped)
pub fn is_mp3(mime_type: &str) -> bool {
    mime_type.contains("mp3")
}

/// Pick the first preference the platform supports.
///
/// The preference order is never reshuffled, so identical environments
/// always negotiate the same container.
pub fn negotiate_mime<F>(preferences: &[String], is_supported: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    preferences.iter().find(|mime| is_supported(mime)).cloned()
}

/// Format seconds as `m:ss`
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Extension hint for a decoder probe, derived from the MIME type
pub fn probe_hint(mime_type: &str) -> Option<&'static str> {
    match file_extension(mime_type) {
        GENERIC_EXTENSION => {
            if mime_type.contains("mpeg") {
                Some("mp3")
            } else if mime_type.contains("ogg") {
                Some("ogg")
            } else {
                None
            }
        }
        ext => Some(ext),
    }
}

/// MIME type for a file path, from its extension
pub fn mime_for_path(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp3" => MP3_MIME,
        "webm" => "audio/webm",
        "mp4" | "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        _ => "application/octet-stream",
    }
}
