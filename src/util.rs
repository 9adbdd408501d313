/// Truncate to `max_chars` characters, appending "..." when shortened.
///
/// Counts chars, not bytes, so multi-byte input never panics the slice.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Make a label safe to embed in a filename.
///
/// Path separators and control characters become `-`; everything else is
/// kept so exported files stay recognizable.
pub fn sanitize_filename_component(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | ':' | '\0') || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .collect();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}
