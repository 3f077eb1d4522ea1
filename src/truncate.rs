// src/truncate.rs

/// Shorten `text` so its UTF-8 encoding fits in `max_bytes`.
///
/// Text that already fits is returned unchanged. Otherwise the longest
/// prefix that ends on a char boundary is taken and cut back to the last
/// whitespace, dropping the trailing partial word and the separator. A
/// candidate without any whitespace yields an empty string rather than a
/// broken word.
pub fn shorten_to_bytes(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    // Largest char boundary at or below the budget; never splits a code point.
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let candidate = &text[..end];

    // Everything before the last whitespace char. A leading whitespace
    // leaves nothing in front of it, which is also the empty result.
    match candidate.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        Some((idx, _)) => candidate[..idx].to_string(),
        None => String::new(),
    }
}
