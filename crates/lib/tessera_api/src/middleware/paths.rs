//! Ant-style path matching for the client-path trust tiers.
//!
//! Patterns are `/`-segmented: `*` matches within one segment, `**`
//! matches any number of segments (including none).

/// Match a request path against a pattern.
pub fn matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match_segments(&pattern, &path)
}

/// Whether any pattern — prefixed with the context path — matches.
pub fn any_matches(patterns: &[String], context_path: &str, path: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| matches(&format!("{context_path}{pattern}"), path))
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => match_segment(segment, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn match_segment(pattern: &str, value: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == value,
        Some((prefix, rest)) => {
            let Some(remainder) = value.strip_prefix(prefix) else {
                return false;
            };
            // Try every split point for the '*'
            (0..=remainder.len())
                .filter(|i| remainder.is_char_boundary(*i))
                .any(|i| match_segment(rest, &remainder[i..]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_match_exactly() {
        assert!(matches("/auth/identity", "/auth/identity"));
        assert!(!matches("/auth/identity", "/auth/identity/extra"));
        assert!(!matches("/auth/identity", "/auth"));
    }

    #[test]
    fn single_star_stays_within_a_segment() {
        assert!(matches("/client/*", "/client/info"));
        assert!(!matches("/client/*", "/client/info/deep"));
        assert!(matches("/client/in*", "/client/info"));
    }

    #[test]
    fn double_star_spans_segments() {
        assert!(matches("/client/**", "/client"));
        assert!(matches("/client/**", "/client/info"));
        assert!(matches("/client/**", "/client/a/b/c"));
        assert!(!matches("/client/**", "/auth/identity"));
    }

    #[test]
    fn context_path_prefixes_every_pattern() {
        let patterns = vec!["/client/**".to_string()];
        assert!(any_matches(&patterns, "/api", "/api/client/info"));
        assert!(!any_matches(&patterns, "/api", "/client/info"));
    }

    #[test]
    fn trailing_slashes_are_lenient() {
        assert!(matches("/auth/identity/", "/auth/identity"));
        assert!(matches("/auth/identity", "/auth/identity/"));
    }
}
