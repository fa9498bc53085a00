//! URL predicates used by post-conditions and direct navigation.

//!
//! In YAML and JSON a pattern is either the bare word `any` or a map with a
//! single key naming the kind: `{ regex: "/login" }`, `{ glob: "**/basket*" }`.

use crate::result::{TenazError, TenazResult};
use serde::de::{self, IgnoredAny, MapAccess, Unexpected, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const KINDS: &[&str] = &["exact", "prefix", "contains", "regex", "glob", "any"];

/// URL pattern for matching the current location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "**/basket*")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Create a regex pattern
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex(pattern.into())
    }

    /// Create a substring pattern
    #[must_use]
    pub fn contains(fragment: impl Into<String>) -> Self {
        Self::Contains(fragment.into())
    }

    fn keyed(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::Exact(p) => Some(("exact", p)),
            Self::Prefix(p) => Some(("prefix", p)),
            Self::Contains(p) => Some(("contains", p)),
            Self::Regex(p) => Some(("regex", p)),
            Self::Glob(p) => Some(("glob", p)),
            Self::Any => None,
        }
    }

    fn from_keyed(kind: &str, pattern: String) -> Option<Self> {
        match kind {
            "exact" => Some(Self::Exact(pattern)),
            "prefix" => Some(Self::Prefix(pattern)),
            "contains" => Some(Self::Contains(pattern)),
            "regex" => Some(Self::Regex(pattern)),
            "glob" => Some(Self::Glob(pattern)),
            _ => None,
        }
    }

    /// Check that the pattern is well formed
    pub fn validate(&self) -> TenazResult<()> {
        match self {
            Self::Regex(pattern) => regex::Regex::new(pattern).map(|_| ()).map_err(|e| {
                TenazError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }
            }),
            Self::Exact(p) | Self::Prefix(p) | Self::Contains(p) | Self::Glob(p)
                if p.is_empty() =>
            {
                Err(TenazError::InvalidPattern {
                    pattern: String::new(),
                    message: "pattern must not be empty".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => glob_matches(pattern, url),
            Self::Any => true,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p}"),
            Self::Prefix(p) => write!(f, "url starts with {p}"),
            Self::Contains(p) => write!(f, "url contains {p}"),
            Self::Regex(p) => write!(f, "url =~ /{p}/"),
            Self::Glob(p) => write!(f, "url like {p}"),
            Self::Any => write!(f, "any url"),
        }
    }
}

impl Serialize for UrlPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some((kind, pattern)) = self.keyed() else {
            return serializer.serialize_str("any");
        };
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(kind, pattern)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for UrlPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PatternVisitor)
    }
}

struct PatternVisitor;

impl<'de> Visitor<'de> for PatternVisitor {
    type Value = UrlPattern;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("`any` or a single-key map such as { regex: \"/login\" }")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<UrlPattern, E> {
        if value == "any" {
            Ok(UrlPattern::Any)
        } else {
            Err(E::invalid_value(Unexpected::Str(value), &self))
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<UrlPattern, A::Error> {
        let Some(kind) = map.next_key::<String>()? else {
            return Err(de::Error::invalid_length(0, &self));
        };
        let pattern = if kind == "any" {
            let _ = map.next_value::<IgnoredAny>()?;
            UrlPattern::Any
        } else {
            let value: String = map.next_value()?;
            UrlPattern::from_keyed(&kind, value)
                .ok_or_else(|| de::Error::unknown_variant(&kind, KINDS))?
        };
        if map.next_key::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(2, &self));
        }
        Ok(pattern)
    }
}

/// `**` spans path separators, `*` stays within one segment, `?` is one
/// character. Anchored at both ends.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                let _ = chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}

fn glob_matches(pattern: &str, url: &str) -> bool {
    regex::Regex::new(&glob_to_regex(pattern))
        .map(|re| re.is_match(url))
        .unwrap_or(false)
}
