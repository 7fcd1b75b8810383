//! Text cleanup applied while ingesting commits

/// Replacement for each invalid byte sequence
pub const REPLACEMENT_CHAR: char = '?';

/// Fallback username for entries that carry none
pub const UNKNOWN_USER: &str = "Unknown";

/// Decode `bytes` as UTF-8, replacing every invalid sequence with `?`
///
/// ```
/// use logmill::sanitize::filter_utf8;
///
/// assert_eq!(filter_utf8(b"caf\xc3\xa9"), "café");
/// assert_eq!(filter_utf8(b"bad\xffbyte"), "bad?byte");
/// ```
pub fn filter_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        if !chunk.invalid().is_empty() {
            out.push(REPLACEMENT_CHAR);
        }
    }
    out
}

/// Normalise a username read from a log or repository
///
/// Control characters are dropped and surrounding whitespace trimmed. An empty
/// result becomes [`UNKNOWN_USER`].
pub fn clean_username(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        UNKNOWN_USER.to_string()
    } else {
        trimmed.to_string()
    }
}
