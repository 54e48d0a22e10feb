//! Teammate types.

use serde::{Deserialize, Serialize};

/// A collaborator account on a SendGrid account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teammate {
    /// Email address, the teammate's identity.
    pub email: String,

    /// Whether the teammate has admin privileges.
    #[serde(default)]
    pub is_admin: bool,

    /// Permission scopes granted to the teammate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl Teammate {
    /// Creates a teammate with no scopes.
    pub fn new(email: impl Into<String>, is_admin: bool) -> Self {
        Self {
            email: email.into(),
            is_admin,
            scopes: Vec::new(),
        }
    }

    /// Sets the permission scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

/// Body of a teammate lookup, which may be a single record or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TeammateLookup {
    Many(Vec<Teammate>),
    One(Teammate),
}

impl From<TeammateLookup> for Vec<Teammate> {
    fn from(lookup: TeammateLookup) -> Self {
        match lookup {
            TeammateLookup::Many(teammates) => teammates,
            TeammateLookup::One(teammate) => vec![teammate],
        }
    }
}
