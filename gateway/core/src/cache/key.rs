//! Query Keys
//!
//! A key is an ordered tuple of scalars `(domain, operation, params...)`.
//! Two invocations with equal keys share one cache entry; a key prefix
//! addresses a whole domain for invalidation.

use std::fmt;

/// One scalar segment of a query key
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    /// Textual segment (domain or operation name)
    Str(String),
    /// Numeric parameter
    Int(i64),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Structured cache key with deep equality over its parts
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    parts: Vec<KeyPart>,
}

impl QueryKey {
    /// Create a key rooted at a domain segment
    pub fn new(domain: impl Into<KeyPart>) -> Self {
        Self {
            parts: vec![domain.into()],
        }
    }

    /// Append a segment
    #[must_use]
    pub fn push(mut self, part: impl Into<KeyPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    /// The key's segments in order
    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Whether this key begins with all of `prefix`'s segments
    #[must_use]
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.parts.len() >= prefix.parts.len()
            && self.parts[..prefix.parts.len()] == prefix.parts[..]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_equality() {
        let a = QueryKey::new("analytics").push("recent-students").push(5u32);
        let b = QueryKey::new("analytics").push("recent-students").push(5u32);
        let c = QueryKey::new("analytics").push("recent-students").push(10u32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_prefix_matching() {
        let domain = QueryKey::new("analytics");
        let key = QueryKey::new("analytics").push("total-students");
        assert!(key.starts_with(&domain));
        assert!(key.starts_with(&key));
        assert!(!domain.starts_with(&key));
        assert!(!QueryKey::new("chat").starts_with(&domain));
    }

    #[test]
    fn test_display() {
        let key = QueryKey::new("analytics").push("recent-students").push(5u32);
        assert_eq!(key.to_string(), "analytics/recent-students/5");
    }
}
