//! Identifier helpers shared by the tag parser and the emitter.

/// Returns true if `s` is a legal identifier (`[A-Za-z_][A-Za-z0-9_]*`).
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Makes `s` a legal identifier by replacing illegal characters with `_`.
///
/// A leading digit (or an empty input) gets a `_` prefix.
#[must_use]
pub fn sanitize_identifier(s: &str) -> String {
    let mut result: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if result.is_empty() || result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// Converts a declared name to snake_case.
///
/// Runs of capitals are kept together as one word, so `HTTPServer` becomes
/// `http_server` and `UserID` becomes `user_id`.
#[must_use]
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_lower);
            if boundary && !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
        }
        result.push(c.to_ascii_lowercase());
    }

    while result.ends_with('_') && result.len() > 1 {
        result.pop();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("radius"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("x2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2x"));
        assert!(!is_identifier("foo-bar"));
        assert!(!is_identifier("foo bar"));
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Point"), "Point");
        assert_eq!(sanitize_identifier("Point[T]"), "Point_T_");
        assert_eq!(sanitize_identifier("3d"), "_3d");
        assert_eq!(sanitize_identifier(""), "_");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Radius"), "radius");
        assert_eq!(to_snake_case("clOrdId"), "cl_ord_id");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("UserID"), "user_id");
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("X"), "x");
        assert_eq!(to_snake_case("Ipv4Addr"), "ipv4_addr");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }
}
