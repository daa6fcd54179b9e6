//! Object key minting and name sanitisation.

use crate::types::StoredObjectKey;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of the random component of a minted key
const RANDOM_SUFFIX_LEN: usize = 6;

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Leading dots are replaced too, so a sanitized name can never be `.` or `..`.
/// An empty input becomes `"file"`.
pub fn sanitize_file_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let leading_dots = sanitized.chars().take_while(|c| *c == '.').count();
    if leading_dots > 0 {
        sanitized.replace_range(..leading_dots, &"_".repeat(leading_dots));
    }

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

/// Sanitize each `/`-separated segment of a category, dropping empty ones
fn sanitize_category(category: &str) -> String {
    let segments: Vec<String> = category
        .split('/')
        .filter(|segment| !segment.trim().is_empty())
        .map(sanitize_file_name)
        .collect();

    if segments.is_empty() {
        "uploads".to_string()
    } else {
        segments.join("/")
    }
}

/// Mint a fresh key `<category>/<timestamp-ms>-<random>-<sanitized-name>`
pub fn mint_key(category: &str, display_name: &str) -> StoredObjectKey {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    StoredObjectKey::new(format!(
        "{}/{}-{}-{}",
        sanitize_category(category),
        timestamp,
        random,
        sanitize_file_name(display_name)
    ))
}

/// Percent-encode a key for use in a URL path, keeping `/` separators
pub(crate) fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
