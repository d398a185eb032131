//! Splitting long messages to fit a per-message character limit.

/// Split `text` into parts of at most `limit` characters.
///
/// Each cut happens at the last newline that keeps the part within the limit;
/// that newline is dropped. A line that is itself longer than the limit is
/// cut on a character boundary. Empty parts are never produced, so an empty
/// input yields no parts.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts = Vec::new();
    let mut rest = text;

    while let Some((cut, next)) = rest.char_indices().nth(limit) {
        // `rest` is longer than the limit. A newline sitting exactly at the
        // limit still allows a full-length part before it.
        let window = &rest[..cut + next.len_utf8()];
        match window.rfind('\n') {
            Some(pos) => {
                push_part(&mut parts, &rest[..pos]);
                rest = &rest[pos + 1..];
            }
            None => {
                push_part(&mut parts, &rest[..cut]);
                rest = &rest[cut..];
            }
        }
    }
    push_part(&mut parts, rest);
    parts
}

fn push_part(parts: &mut Vec<String>, part: &str) {
    if !part.is_empty() {
        parts.push(part.to_string());
    }
}
