//! Writing decoded artifacts to disk: attachments, meta sidecars, and
//! rich-text bodies.

pub mod attachment;
pub mod body;

/// Sanitize a string for use in filenames.
///
/// Replaces path separators and other invalid characters with `_` and
/// truncates to `max_len` characters.
pub fn sanitize_filename_part(input: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_len));
    for c in input.chars() {
        if out.chars().count() >= max_len {
            break;
        }
        let mapped = match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        };
        out.push(mapped);
    }
    let trimmed = out.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
