//! File naming helpers for rendered export files.

use chrono::{DateTime, Utc};

/// Longest name part kept in a file stem. The date and id suffix add 48
/// bytes, which keeps whole file names well under the 255-byte limit.
pub const MAX_STEM_NAME_LEN: usize = 100;

/// Replaces every character that is not an ASCII letter or digit with `_`
/// and truncates the result to [`MAX_STEM_NAME_LEN`] characters.
pub fn sanitize_file_stem(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .take(MAX_STEM_NAME_LEN)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        "export".to_string()
    } else {
        sanitized
    }
}

/// Builds the file stem `<sanitized name>_<YYYY-MM-DD>_<id>`.
///
/// The trailing identifier keeps stems unique across jobs that share a
/// name and a day.
pub fn export_file_stem(name: &str, generated_at: DateTime<Utc>, id: &str) -> String {
    format!(
        "{}_{}_{}",
        sanitize_file_stem(name),
        generated_at.format("%Y-%m-%d"),
        id
    )
}
