//! Display-weight of a social post, as counted by X.
//!
//! CJK characters and emoji count twice, every `http(s)://` URL counts as a
//! fixed-width t.co link no matter how long it really is.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

pub const MAX_POST_LENGTH: usize = 280;

/// Weight of a URL after t.co shortening.
pub const URL_WEIGHT: usize = 23;

const WIDE_RANGES: &[(u32, u32)] = &[
    (0x1100, 0x11FF),   // Hangul Jamo
    (0x2E80, 0x9FFF),   // CJK Radicals .. CJK Unified Ideographs
    (0xAC00, 0xD7FF),   // Hangul Syllables
    (0xF900, 0xFAFF),   // CJK Compatibility Ideographs
    (0xFE30, 0xFE4F),   // CJK Compatibility Forms
    (0xFF00, 0xFFEF),   // Halfwidth and Fullwidth Forms
    (0x3000, 0x303F),   // CJK Symbols and Punctuation
    (0x3040, 0x309F),   // Hiragana
    (0x30A0, 0x30FF),   // Katakana
    (0x1F000, 0x1FFFF), // Emoticons / Emoji
    (0x20000, 0x2FA1F), // CJK Extension
];

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid URL pattern"));

fn char_weight(c: char) -> usize {
    let cp = c as u32;
    if WIDE_RANGES.iter().any(|&(lo, hi)| lo <= cp && cp <= hi) {
        2
    } else {
        1
    }
}

pub fn weighted_length(text: &str) -> usize {
    let url_count = URL_PATTERN.find_iter(text).count();
    let without_urls = URL_PATTERN.replace_all(text, "");

    let chars: usize = without_urls.chars().map(char_weight).sum();
    chars + url_count * URL_WEIGHT
}

pub fn validate(text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let length = weighted_length(text);
    if length > MAX_POST_LENGTH {
        return Err(ValidationError::LengthExceeded {
            length,
            limit: MAX_POST_LENGTH,
            over_by: length - MAX_POST_LENGTH,
        });
    }

    Ok(())
}
