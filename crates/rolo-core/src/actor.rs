//! Actor: the authenticated identity performing a request.
//!
//! Actors are supplied per request by the identity provider. The core never
//! authenticates them; it only reads identity and role.

use serde::{Deserialize, Serialize};

/// The two roles an actor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  User,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::User => "user",
    }
  }

  /// Parse the wire form (`admin` / `user`), ignoring case and padding.
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "admin" => Some(Self::Admin),
      "user" => Some(Self::User),
      _ => None,
    }
  }
}

/// An authenticated identity with a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  /// Unique and immutable, e.g. an email address or employee identifier.
  pub identity:     String,
  pub role:         Role,
  pub display_name: String,
}

impl Actor {
  pub fn new(identity: impl Into<String>, role: Role) -> Self {
    let identity = identity.into();
    Self { display_name: identity.clone(), identity, role }
  }

  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}
