/// Derives a stable, URL-safe identifier from a display name.
///
/// Theme folders are named by users ("Rainy Night ☔"); stream URLs need a
/// predictable ASCII id. Lowercases, maps whitespace and separators to `_`,
/// drops everything else, and collapses runs of `_`.
///
/// The result is stable for a given input, so the same folder always maps to
/// the same stream route.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_sep = false;
        } else if c.is_whitespace() || c == '-' || c == '_' || c == '.' {
            if !last_sep {
                out.push('_');
                last_sep = true;
            }
        }
        // anything else (emoji, punctuation) is dropped
    }

    while out.ends_with('_') {
        out.pop();
    }

    if out.is_empty() {
        "theme".to_string()
    } else {
        out
    }
}
