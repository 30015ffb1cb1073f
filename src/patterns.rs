//! Pattern compilation shared by the pipeline stages.
//!
//! Every pattern in the crate is a literal, or is built from fixed keywords
//! with `regex::escape`, and is compiled once when its owner is constructed.
//! A pattern that fails to compile is a programming error, so these helpers
//! panic instead of returning a `Result`.

/// Compile a pattern matched against `&str` lines.
pub(crate) fn compile(pattern: &str) -> regex::Regex {
    match regex::Regex::new(pattern) {
        Ok(rx) => rx,
        Err(e) => panic!("invalid pattern {pattern:?}: {e}"),
    }
}

/// Compile a pattern matched against raw byte lines.
pub(crate) fn compile_bytes(pattern: &str) -> regex::bytes::Regex {
    match regex::bytes::Regex::new(pattern) {
        Ok(rx) => rx,
        Err(e) => panic!("invalid pattern {pattern:?}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_both_flavours() {
        assert!(compile(r"^\d{4}$").is_match("0987"));
        assert!(compile_bytes(r"^\d{4}$").is_match(b"0987"));
    }

    #[test]
    #[should_panic(expected = "invalid pattern")]
    fn bad_literal_panics() {
        compile("(unclosed");
    }
}
