//! Registration entries describing a publisher or subscriber.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Endpoint, Topic};
use crate::error::RegistrarError;

/// Which side of a topic an actor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Actor publishes on the topic.
    Publisher,
    /// Actor subscribes to the topic.
    Subscriber,
}

impl Role {
    /// Both roles, publishers first.
    pub const ALL: [Self; 2] = [Self::Publisher, Self::Subscriber];

    /// Lowercase name used in logs and the admin API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RegistrarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "publisher" | "pub" => Ok(Self::Publisher),
            "subscriber" | "sub" => Ok(Self::Subscriber),
            other => Err(RegistrarError::InvalidRequest(format!(
                "unknown role '{other}'"
            ))),
        }
    }
}

/// Registration of one actor on one topic.
///
/// Entries are never mutated once stored; replacing one is a remove
/// followed by an add. Two entries are the same registration when
/// [`RegistrationEntry::key`] is equal, regardless of the description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationEntry {
    /// Owning actor name.
    pub name: String,
    /// Topic the actor publishes or subscribes on.
    pub topic: Topic,
    /// Where the actor can be reached (its proxy).
    pub endpoint: Endpoint,
    /// Publisher or subscriber.
    pub role: Role,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Identity of a registration inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationKey {
    /// Owning actor name.
    pub name: String,
    /// Registered topic.
    pub topic: Topic,
    /// Actor endpoint.
    pub endpoint: Endpoint,
    /// Registered role.
    pub role: Role,
}

impl RegistrationEntry {
    /// Creates a new entry with an empty description.
    #[must_use]
    pub fn new(name: impl Into<String>, topic: Topic, endpoint: Endpoint, role: Role) -> Self {
        Self {
            name: name.into(),
            topic,
            endpoint,
            role,
            description: String::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the uniqueness key `(name, topic, endpoint, role)`.
    #[must_use]
    pub fn key(&self) -> RegistrationKey {
        RegistrationKey {
            name: self.name.clone(),
            topic: self.topic.clone(),
            endpoint: self.endpoint.clone(),
            role: self.role,
        }
    }

    /// Returns `true` when every field needed to register is populated:
    /// a name, a topic with a concrete domain and a reachable endpoint.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && self.topic.domain().is_some()
            && !self.endpoint.host.trim().is_empty()
            && self.endpoint.port != 0
    }
}
