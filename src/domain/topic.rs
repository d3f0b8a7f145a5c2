//! Hierarchical `domain.subject.type` topics.
//!
//! Each segment is either a concrete name or a wildcard (`*`). A missing
//! trailing segment is a wildcard too, so `"data"` and `"data.*.*"` are the
//! same topic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistrarError;

/// Wildcard marker for a topic segment.
pub const ANY: &str = "*";

/// Segment separator in the text form.
pub const SEPARATOR: char = '.';

/// Immutable topic value. `None` segments are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic {
    domain: Option<String>,
    subject: Option<String>,
    kind: Option<String>,
}

impl Topic {
    /// Builds a topic from its three segments. `"*"` and empty strings become
    /// wildcards.
    #[must_use]
    pub fn new(domain: &str, subject: &str, kind: &str) -> Self {
        Self {
            domain: segment(domain),
            subject: segment(subject),
            kind: segment(kind),
        }
    }

    /// The topic that matches every registration.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            domain: None,
            subject: None,
            kind: None,
        }
    }

    /// Domain segment, `None` when wildcarded.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Subject segment, `None` when wildcarded.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Type segment, `None` when wildcarded.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns `true` when no segment is wildcarded.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        self.domain.is_some() && self.subject.is_some() && self.kind.is_some()
    }

    /// Returns `true` if a registration on `self` satisfies `query`.
    ///
    /// Every concrete segment of the query must equal the corresponding
    /// segment here. Wildcard query segments accept anything.
    #[must_use]
    pub fn matches(&self, query: &Self) -> bool {
        segment_matches(self.domain.as_deref(), query.domain.as_deref())
            && segment_matches(self.subject.as_deref(), query.subject.as_deref())
            && segment_matches(self.kind.as_deref(), query.kind.as_deref())
    }
}

fn segment(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() || s == ANY {
        None
    } else {
        Some(s.to_string())
    }
}

fn segment_matches(registered: Option<&str>, query: Option<&str>) -> bool {
    match query {
        None => true,
        Some(q) => registered == Some(q),
    }
}

impl FromStr for Topic {
    type Err = RegistrarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RegistrarError::InvalidRequest(
                "topic must not be empty".to_string(),
            ));
        }
        let mut parts = s.splitn(3, SEPARATOR);
        let domain = parts.next().unwrap_or_default();
        if domain.trim().is_empty() {
            return Err(RegistrarError::InvalidRequest(format!(
                "topic '{s}' has an empty domain"
            )));
        }
        let subject = parts.next().unwrap_or(ANY);
        let kind = parts.next().unwrap_or(ANY);
        Ok(Self::new(domain, subject, kind))
    }
}

impl TryFrom<String> for Topic {
    type Error = RegistrarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.domain.as_deref().unwrap_or(ANY),
            self.subject.as_deref().unwrap_or(ANY),
            self.kind.as_deref().unwrap_or(ANY),
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn topic(s: &str) -> Topic {
        let Ok(t) = s.parse() else {
            panic!("valid topic {s}");
        };
        t
    }

    #[test]
    fn missing_segments_are_wildcards() {
        assert_eq!(topic("data"), topic("data.*.*"));
        assert_eq!(topic("data.power"), topic("data.power.*"));
        assert_eq!(topic("*"), Topic::any());
    }

    #[test]
    fn type_keeps_remaining_text() {
        let t = topic("a.b.c.d");
        assert_eq!(t.kind(), Some("c.d"));
    }

    #[test]
    fn empty_domain_is_rejected() {
        assert!("".parse::<Topic>().is_err());
        assert!(".b.c".parse::<Topic>().is_err());
    }

    #[test]
    fn concrete_query_matches_only_exact() {
        let query = topic("a.b.c");
        assert!(topic("a.b.c").matches(&query));
        assert!(!topic("a.b.*").matches(&query));
        assert!(!topic("a.*.*").matches(&query));
    }

    #[test]
    fn wildcard_query_matches_agreeing_entries() {
        let query = topic("a.*.*");
        assert!(topic("a.b.c").matches(&query));
        assert!(topic("a.b.*").matches(&query));
        assert!(topic("a.*.*").matches(&query));
        assert!(!topic("x.b.c").matches(&query));

        let query = topic("a.b");
        assert!(topic("a.b.c").matches(&query));
        assert!(!topic("a.x.c").matches(&query));
    }

    #[test]
    fn any_matches_everything() {
        assert!(topic("x.y.z").matches(&Topic::any()));
    }

    #[test]
    fn serde_uses_text_form() {
        let Ok(json) = serde_json::to_string(&topic("a.b")) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"a.b.*\"");
        let Ok(back) = serde_json::from_str::<Topic>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(back, topic("a.b"));
    }
}
