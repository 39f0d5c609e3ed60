/// Canonical form of a user-typed ingredient name.
///
/// Trims surrounding whitespace and collapses every internal run of
/// whitespace (including the ideographic space U+3000) to a single ASCII
/// space. Whitespace-only input yields an empty string, which callers treat
/// as "nothing to do".
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Case-insensitive equality between two canonical names.
#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}
