//! Caller roles.

use serde::{Deserialize, Serialize};

/// Role granted to an authenticated caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular navigating user.
    Rider,
    /// Moderator with incident-status authority.
    Admin,
}

impl Role {
    /// Wire/log representation (`"rider"` / `"admin"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
