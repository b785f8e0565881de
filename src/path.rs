//! Field paths: caller input → canonical segment list.
//!
//! A path is either a dotted string (`"items.*.name"`) or a sequence of raw
//! tokens (`["items", 0, "name"]`). Both normalize to the same `Vec<String>`:
//! every piece trimmed, empty pieces dropped. Normalization never fails.

use serde::Deserialize;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Caller-supplied field path, before normalization. Deserializes from a JSON
/// string or an array of strings and integers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldPath {
    /// `.`-delimited segments.
    Dotted(String),
    /// Already split segments, stringified during normalization.
    Tokens(Vec<PathToken>),
}

/// One raw segment of a programmatic path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PathToken {
    Key(String),
    Index(i64),
}

/// A segment read as an array/tuple position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayIndex {
    /// `*` or `[]`
    Wildcard,
    At(usize),
}

const WILDCARD_TOKENS: [&str; 2] = ["*", "[]"];

// ————————————————————————————————————————————————————————————————————————————
// NORMALIZATION
// ————————————————————————————————————————————————————————————————————————————

/// Canonical segment list for `path`. Idempotent: feeding the result back in
/// as tokens yields the same list.
pub fn normalize(path: &FieldPath) -> Vec<String> {
    match path {
        FieldPath::Dotted(src) => src
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        FieldPath::Tokens(tokens) => tokens
            .iter()
            .map(|t| t.to_string())
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

impl ArrayIndex {
    /// `None` when the segment is neither a wildcard nor a base-10 literal.
    /// Literals too large for `usize` saturate; they can only ever land on a
    /// tuple's rest element.
    pub fn parse(segment: &str) -> Option<Self> {
        if WILDCARD_TOKENS.contains(&segment) {
            return Some(ArrayIndex::Wildcard);
        }
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            return Some(ArrayIndex::At(segment.parse().unwrap_or(usize::MAX)));
        }
        None
    }

    /// Concrete slot for positional lookups; wildcards probe slot 0.
    pub fn slot(self) -> usize {
        match self {
            ArrayIndex::Wildcard => 0,
            ArrayIndex::At(i) => i,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

impl std::fmt::Display for PathToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathToken::Key(k) => f.write_str(k),
            PathToken::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathToken {
    fn from(s: &str) -> Self { PathToken::Key(s.to_owned()) }
}

impl From<String> for PathToken {
    fn from(s: String) -> Self { PathToken::Key(s) }
}

impl From<&String> for PathToken {
    fn from(s: &String) -> Self { PathToken::Key(s.clone()) }
}

impl From<i64> for PathToken {
    fn from(i: i64) -> Self { PathToken::Index(i) }
}

impl From<i32> for PathToken {
    fn from(i: i32) -> Self { PathToken::Index(i64::from(i)) }
}

impl From<u32> for PathToken {
    fn from(i: u32) -> Self { PathToken::Index(i64::from(i)) }
}

impl From<usize> for PathToken {
    fn from(i: usize) -> Self { PathToken::Index(i64::try_from(i).unwrap_or(i64::MAX)) }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self { FieldPath::Dotted(s.to_owned()) }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self { FieldPath::Dotted(s) }
}

impl From<&String> for FieldPath {
    fn from(s: &String) -> Self { FieldPath::Dotted(s.clone()) }
}

impl From<&FieldPath> for FieldPath {
    fn from(p: &FieldPath) -> Self { p.clone() }
}

impl<T: Into<PathToken>> From<Vec<T>> for FieldPath {
    fn from(tokens: Vec<T>) -> Self {
        FieldPath::Tokens(tokens.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PathToken>, const N: usize> From<[T; N]> for FieldPath {
    fn from(tokens: [T; N]) -> Self {
        FieldPath::Tokens(tokens.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PathToken> + Clone> From<&[T]> for FieldPath {
    fn from(tokens: &[T]) -> Self {
        FieldPath::Tokens(tokens.iter().cloned().map(Into::into).collect())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(p: impl Into<FieldPath>) -> Vec<String> {
        normalize(&p.into())
    }

    #[test]
    fn dotted_paths_drop_blank_segments() {
        assert_eq!(norm("a.b.c"), vec!["a", "b", "c"]);
        assert_eq!(norm(" a . b "), vec!["a", "b"]);
        assert_eq!(norm("..a...b."), vec!["a", "b"]);
        assert!(norm("").is_empty());
        assert!(norm(" . . ").is_empty());
    }

    #[test]
    fn token_paths_are_stringified() {
        assert_eq!(norm(["items".into(), PathToken::from(0), "name".into()]), vec!["items", "0", "name"]);
        assert_eq!(norm(vec![" x ", "", "y"]), vec!["x", "y"]);
        assert!(norm(Vec::<PathToken>::new()).is_empty());
    }

    #[test]
    fn token_segments_keep_embedded_dots() {
        // only the string form splits on `.`
        assert_eq!(norm(vec!["a.b"]), vec!["a.b"]);
    }

    #[test]
    fn array_index_tokens() {
        assert_eq!(ArrayIndex::parse("*"), Some(ArrayIndex::Wildcard));
        assert_eq!(ArrayIndex::parse("[]"), Some(ArrayIndex::Wildcard));
        assert_eq!(ArrayIndex::parse("0"), Some(ArrayIndex::At(0)));
        assert_eq!(ArrayIndex::parse("42"), Some(ArrayIndex::At(42)));
        assert_eq!(ArrayIndex::parse("99999999999999999999999"), Some(ArrayIndex::At(usize::MAX)));
        assert_eq!(ArrayIndex::parse("-1"), None);
        assert_eq!(ArrayIndex::parse("1.5"), None);
        assert_eq!(ArrayIndex::parse("first"), None);
        assert_eq!(ArrayIndex::parse(""), None);
        assert_eq!(ArrayIndex::parse("0x1"), None);
        assert_eq!(ArrayIndex::parse("٣"), None);
        assert_eq!(ArrayIndex::Wildcard.slot(), 0);
    }

    #[test]
    fn paths_deserialize_from_json() {
        let dotted: FieldPath = serde_json::from_str(r#""a.b""#).unwrap();
        assert_eq!(dotted, FieldPath::from("a.b"));
        let tokens: FieldPath = serde_json::from_str(r#"["a", 0, "b"]"#).unwrap();
        assert_eq!(normalize(&tokens), vec!["a", "0", "b"]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Normalizing an already-normalized path changes nothing.
            #[test]
            fn normalize_is_idempotent(src in "[a-z0-9 .*\\[\\]]{0,40}") {
                let once = normalize(&FieldPath::from(src.as_str()));
                let twice = normalize(&FieldPath::from(once.clone()));
                prop_assert_eq!(&once, &twice);
                let rejoined = normalize(&FieldPath::from(once.join(".")));
                prop_assert_eq!(once, rejoined);
            }

            /// No segment is ever blank or padded.
            #[test]
            fn segments_are_trimmed_and_non_empty(tokens in prop::collection::vec("[ a-z]{0,6}", 0..8)) {
                for seg in normalize(&FieldPath::from(tokens)) {
                    prop_assert!(!seg.is_empty());
                    prop_assert_eq!(seg.trim(), seg.as_str());
                }
            }
        }
    }
}
