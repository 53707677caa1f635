//! Object key generation for uploads.
//!
//! Keys have the shape `{prefix}/{timestamp}-{suffix}-{name}.{ext}` where the
//! timestamp is the UTC upload time with `:` and `.` replaced by `-`, and the
//! suffix is six random base36 characters. Apart from the `T`/`Z` markers of
//! the timestamp every character is in `[a-z0-9._/-]`.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

pub const DEFAULT_PREFIX: &str = "uploads";
const FALLBACK_EXTENSION: &str = "bin";
const SUFFIX_LEN: usize = 6;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Derive a fresh storage key for `filename` under `prefix`.
pub fn generate_key(prefix: &str, filename: &str) -> String {
    compose_key(prefix, filename, Utc::now(), &random_suffix())
}

/// Deterministic core of [`generate_key`].
pub(crate) fn compose_key(
    prefix: &str,
    filename: &str,
    now: DateTime<Utc>,
    suffix: &str,
) -> String {
    let ext = extension_of(filename);
    let safe_name = sanitize_segment(filename);
    let ts = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");

    let key = format!(
        "{}/{}-{}-{}.{}",
        sanitize_prefix(prefix),
        ts,
        suffix,
        safe_name,
        ext
    );
    collapse_first_dot_run(&key)
}

/// Extension after the last `.`; the whole name when there is no dot.
fn extension_of(filename: &str) -> String {
    let raw = filename.rsplit('.').next().unwrap_or(filename);
    let ext = sanitize_segment(raw);
    if ext.is_empty() {
        FALLBACK_EXTENSION.to_string()
    } else {
        ext
    }
}

/// Lower-case, map every run outside `[a-z0-9.-]` to one `-`, collapse
/// repeated `-` and trim `-` from both ends.
fn sanitize_segment(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        let c = if matches!(c, 'a'..='z' | '0'..='9' | '.' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

fn sanitize_prefix(prefix: &str) -> String {
    let cleaned = prefix
        .split('/')
        .map(sanitize_segment)
        .filter(|segment| !segment.is_empty() && segment.chars().any(|c| c != '.'))
        .collect::<Vec<_>>()
        .join("/");
    if cleaned.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        cleaned
    }
}

/// Replace the first run of two or more dots with a single dot.
fn collapse_first_dot_run(key: &str) -> String {
    let Some(start) = key.find("..") else {
        return key.to_string();
    };
    let run_len = key[start..].chars().take_while(|&c| c == '.').count();
    format!("{}.{}", &key[..start], &key[start + run_len..])
}

fn random_suffix() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        suffix.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn assert_key_shape(prefix: &str, key: &str) {
        let rest = key
            .strip_prefix(&format!("{}/", prefix))
            .unwrap_or_else(|| panic!("{key} does not start with {prefix}/"));
        // timestamp: 2024-01-15T10-30-00-000Z
        let (ts, tail) = rest.split_at(24);
        assert!(ts.chars().all(|c| c.is_ascii_digit() || matches!(c, 'T' | 'Z' | '-')));
        let tail = tail.strip_prefix('-').expect("dash after timestamp");
        let (suffix, name) = tail.split_at(SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        let name = name.strip_prefix('-').expect("dash after suffix");
        assert!(!name.is_empty());
        assert!(
            name.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || c == '.' || c == '-')
        );
    }

    #[test]
    fn composes_timestamp_suffix_and_name() {
        let key = compose_key("uploads", "test-image.png", fixed_now(), "abc123");
        assert_eq!(key, "uploads/2024-01-15T10-30-00-000Z-abc123-test-image.png.png");
    }

    #[test]
    fn name_without_dot_is_reused_as_extension() {
        let key = compose_key("uploads", "noextension", fixed_now(), "abc123");
        assert!(key.ends_with("-noextension.noextension"));
    }

    #[test]
    fn strips_special_characters() {
        let key = compose_key("uploads", "My File (1) @ Test!.png", fixed_now(), "zz9zz9");
        assert!(key.ends_with("-my-file-1-test-.png.png"), "{key}");
        assert!(!key.contains(['@', '!', '(', ')', ' ']));
        assert_key_shape("uploads", &key);
    }

    #[test]
    fn extension_is_lowercased_and_sanitized() {
        let key = compose_key("media", "Clip.M P4", fixed_now(), "aaaaaa");
        assert!(key.ends_with("-clip.m-p4.m-p4"), "{key}");
    }

    #[test]
    fn empty_extension_falls_back_to_bin() {
        let key = compose_key("uploads", "report.", fixed_now(), "aaaaaa");
        assert!(key.ends_with("-report.bin"), "{key}");
    }

    #[test]
    fn collapses_first_run_of_dots() {
        let key = compose_key("uploads", "archive...tar", fixed_now(), "aaaaaa");
        assert!(key.ends_with("-archive.tar.tar"), "{key}");
    }

    #[test]
    fn prefix_is_sanitized_and_defaulted() {
        let key = compose_key("Posters/2024", "a.png", fixed_now(), "aaaaaa");
        assert!(key.starts_with("posters/2024/"));

        let key = compose_key("", "a.png", fixed_now(), "aaaaaa");
        assert!(key.starts_with("uploads/"));

        let key = compose_key("../etc", "a.png", fixed_now(), "aaaaaa");
        assert!(key.starts_with("etc/"), "{key}");
    }

    #[test]
    fn generated_keys_have_expected_shape() {
        for name in ["photo.JPG", "x", "Résumé final.pdf", "...", "@@@"] {
            let key = generate_key("thumbnails", name);
            assert_key_shape("thumbnails", &key);
        }
    }

    #[test]
    fn same_filename_yields_distinct_keys() {
        let a = generate_key("uploads", "same.png");
        let b = generate_key("uploads", "same.png");
        assert_ne!(a, b);
    }

    #[test]
    fn random_suffix_is_six_base36_chars() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
    }
}
