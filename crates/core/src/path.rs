//! Dotted property paths into a data context.
//!
//! A path is a sequence of keys separated by `.`. Numeric keys address
//! array elements, so `items.0.title` reads the title of the first item.

use core::fmt;

use crate::error::{Error, Result};

/// A parsed property path.
///
/// The empty path is the root of the data context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path {
    keys: Vec<String>,
}

impl Path {
    /// Returns the root path.
    pub fn root() -> Self {
        Self { keys: Vec::new() }
    }

    /// Builds a path from already-split keys.
    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a dotted path such as `user.address.city`.
    ///
    /// Surrounding whitespace is ignored. Every segment must be non-empty and
    /// consist only of ASCII alphanumerics, `_` or `$`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_path(text, "empty path"));
        }

        let mut keys = Vec::new();
        for segment in trimmed.split('.') {
            if segment.is_empty() {
                return Err(Error::invalid_path(text, "empty segment"));
            }
            if !segment.chars().all(is_key_char) {
                return Err(Error::invalid_path(
                    text,
                    format!("invalid segment '{segment}'"),
                ));
            }
            keys.push(segment.to_string());
        }
        Ok(Self { keys })
    }

    /// Returns true if `text` parses as a dotted path.
    pub fn is_path(text: &str) -> bool {
        Self::parse(text).is_ok()
    }

    /// Returns the keys of this path.
    #[inline]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the first key, if any.
    #[inline]
    pub fn first(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    /// Returns the last key, if any.
    #[inline]
    pub fn last(&self) -> Option<&str> {
        self.keys.last().map(String::as_str)
    }

    /// Returns the number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if this is the root path.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns a new path with `key` appended.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key.into());
        Self { keys }
    }

    /// Splits off the last key, returning the parent path and that key.
    pub fn split_last(&self) -> Option<(Path, &str)> {
        let (last, parent) = self.keys.split_last()?;
        Some((
            Path {
                keys: parent.to_vec(),
            },
            last.as_str(),
        ))
    }

    /// Returns a new path with every key of `rest` appended.
    pub fn join(&self, rest: &[String]) -> Self {
        let mut keys = self.keys.clone();
        keys.extend(rest.iter().cloned());
        Self { keys }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys.join("."))
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let path = Path::parse("user.name").unwrap();
        assert_eq!(path.keys(), &["user".to_string(), "name".to_string()]);
        assert_eq!(path.first(), Some("user"));
        assert_eq!(path.last(), Some("name"));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let path = Path::parse("  items.0 ").unwrap();
        assert_eq!(path.to_string(), "items.0");
    }

    #[test]
    fn test_parse_rejects_expressions() {
        assert!(Path::parse("a + b").is_err());
        assert!(Path::parse("a..b").is_err());
        assert!(Path::parse("").is_err());
        assert!(Path::parse("a[0]").is_err());
        assert!(!Path::is_path("count > 1"));
    }

    #[test]
    fn test_split_last() {
        let path = Path::parse("a.b.c").unwrap();
        let (parent, key) = path.split_last().unwrap();
        assert_eq!(parent.to_string(), "a.b");
        assert_eq!(key, "c");

        assert!(Path::root().split_last().is_none());
    }

    #[test]
    fn test_child_and_join() {
        let base = Path::parse("items").unwrap();
        let item = base.child("2");
        assert_eq!(item.to_string(), "items.2");

        let joined = item.join(&["title".to_string()]);
        assert_eq!(joined.to_string(), "items.2.title");
    }
}
