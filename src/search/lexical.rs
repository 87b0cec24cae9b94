//! Tokenization for code text.
//!
//! Splits on non-word boundaries and further splits identifiers on
//! camelCase/snake_case transitions before scoring them. The TF-IDF
//! vector space in [`crate::semantic`] is the only consumer of this
//! tokenizer.

/// Simple tokenizer for code.
///
/// Splits on non-word characters and handles camelCase/snake_case.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|s| !s.is_empty())
        .flat_map(split_identifier)
}

/// Split an identifier into sub-tokens (camelCase, snake_case).
fn split_identifier(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }

    let mut tokens = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0;

    for i in 1..bytes.len() {
        let prev = bytes[i - 1] as char;
        let curr = bytes[i] as char;

        // Split on: underscore, lowercase->uppercase transition
        let boundary = curr == '_' || (prev.is_ascii_lowercase() && curr.is_ascii_uppercase());

        if boundary {
            if start < i && bytes[start] != b'_' {
                tokens.push(&s[start..i]);
            }
            start = if curr == '_' { i + 1 } else { i };
        }
    }

    if start < s.len() && bytes[start] != b'_' {
        tokens.push(&s[start..]);
    }

    // Also add the full identifier as a token
    if tokens.len() > 1 {
        tokens.push(s);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens: Vec<_> = tokenize("hello_world").collect();
        assert!(tokens.contains(&"hello"));
        assert!(tokens.contains(&"world"));

        let tokens: Vec<_> = tokenize("HelloWorld").collect();
        assert!(tokens.contains(&"Hello"));
        assert!(tokens.contains(&"World"));
    }
}
