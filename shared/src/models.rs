//! Data models for the Innotaxi users service

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a user or driver account
pub type AccountId = u64;

/// Class of actor a session token is scoped to
///
/// End users and drivers share the same token format; the actor type
/// keeps a driver token from being accepted by user flows and vice versa.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    User,
    Driver,
}

impl ActorType {
    /// Wire name used in token payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::Driver => "driver",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown actor type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActorType(pub String);

impl fmt::Display for UnknownActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown actor type: {}", self.0)
    }
}

impl std::error::Error for UnknownActorType {}

impl FromStr for ActorType {
    type Err = UnknownActorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ActorType::User),
            "driver" => Ok(ActorType::Driver),
            other => Err(UnknownActorType(other.to_string())),
        }
    }
}

/// Subject of a session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    User(AccountId),
    Driver(AccountId),
}

impl Identity {
    pub fn new(actor: ActorType, id: AccountId) -> Self {
        match actor {
            ActorType::User => Identity::User(id),
            ActorType::Driver => Identity::Driver(id),
        }
    }

    pub fn id(&self) -> AccountId {
        match self {
            Identity::User(id) | Identity::Driver(id) => *id,
        }
    }

    pub fn actor_type(&self) -> ActorType {
        match self {
            Identity::User(_) => ActorType::User,
            Identity::Driver(_) => ActorType::Driver,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.actor_type(), self.id())
    }
}

/// Lifecycle status of a user account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Created,
    Deleted,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Created => "created",
            UserStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(UserStatus::Created),
            "deleted" => Ok(UserStatus::Deleted),
            other => Err(format!("unknown user status: {}", other)),
        }
    }
}
