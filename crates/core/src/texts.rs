//! One-or-many text inputs.

use serde::{Deserialize, Serialize};

/// An ordered sequence of texts that remembers whether the caller handed in
/// a lone string.
///
/// A lone string behaves as a one-element sequence everywhere except where a
/// metric explicitly requires a single string (cross-encoder relevancy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Texts {
    Single(String),
    Many(Vec<String>),
}

impl Texts {
    /// The texts as a slice; a lone string is a one-element slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::Many(v) => v,
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s],
            Self::Many(v) => v,
        }
    }

    #[must_use]
    pub const fn is_single(&self) -> bool {
        matches!(self, Self::Single(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// The first text, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.as_slice().first().map(String::as_str)
    }
}

impl From<&str> for Texts {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for Texts {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<&String> for Texts {
    fn from(s: &String) -> Self {
        Self::Single(s.clone())
    }
}

impl From<Vec<String>> for Texts {
    fn from(v: Vec<String>) -> Self {
        Self::Many(v)
    }
}

impl From<Vec<&str>> for Texts {
    fn from(v: Vec<&str>) -> Self {
        Self::Many(v.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Texts {
    fn from(v: &[&str]) -> Self {
        Self::Many(v.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Texts {
    fn from(v: [&str; N]) -> Self {
        Self::Many(v.iter().map(|s| (*s).to_string()).collect())
    }
}

impl From<&[String]> for Texts {
    fn from(v: &[String]) -> Self {
        Self::Many(v.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_string_promotes_to_one_element() {
        let t = Texts::from("hello");
        assert!(t.is_single());
        assert_eq!(t.as_slice(), ["hello".to_string()]);
        assert_eq!(t.into_vec(), vec!["hello".to_string()]);
    }

    #[test]
    fn sequence_keeps_order() {
        let t = Texts::from(vec!["b", "a"]);
        assert!(!t.is_single());
        assert_eq!(t.len(), 2);
        assert_eq!(t.first(), Some("b"));
    }

    #[test]
    fn deserializes_string_or_array() {
        let one: Texts = serde_json::from_str(r#""x""#).unwrap();
        assert_eq!(one, Texts::Single("x".into()));
        let many: Texts = serde_json::from_str(r#"["x","y"]"#).unwrap();
        assert_eq!(many, Texts::Many(vec!["x".into(), "y".into()]));
    }
}
