//! Request actions and their wire names.

use std::fmt;
use std::str::FromStr;

use crate::domain::Role;
use crate::error::RegistrarError;

/// What a request asks the registrar to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Add a registration.
    Register(Role),
    /// Remove a registration.
    Remove(Role),
    /// Look up registrations matching a topic.
    Find(Role),
}

impl Action {
    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register(Role::Publisher) => "registerPublisher",
            Self::Register(Role::Subscriber) => "registerSubscriber",
            Self::Remove(Role::Publisher) => "removePublisher",
            Self::Remove(Role::Subscriber) => "removeSubscriber",
            Self::Find(Role::Publisher) => "findPublisher",
            Self::Find(Role::Subscriber) => "findSubscriber",
        }
    }

    /// Role partition the action operates on.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Register(role) | Self::Remove(role) | Self::Find(role) => role,
        }
    }

    /// Returns `true` for find actions, which carry a topic query instead of
    /// a registration entry.
    #[must_use]
    pub const fn is_find(self) -> bool {
        matches!(self, Self::Find(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RegistrarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "registerPublisher" => Self::Register(Role::Publisher),
            "registerSubscriber" => Self::Register(Role::Subscriber),
            "removePublisher" => Self::Remove(Role::Publisher),
            "removeSubscriber" => Self::Remove(Role::Subscriber),
            "findPublisher" => Self::Find(Role::Publisher),
            "findSubscriber" => Self::Find(Role::Subscriber),
            other => {
                return Err(RegistrarError::Protocol(format!("unknown action '{other}'")));
            }
        })
    }
}
