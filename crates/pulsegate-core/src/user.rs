//! User identity and default-tenant rules

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// User id that callers send to address the local, single-tenant account.
pub const LOCAL_USER_SENTINEL: &str = "local-user";

/// Logical account a request acts on.
///
/// In single-tenant (local) mode this is `Default`. In hosted multi-user mode
/// each caller-supplied id maps to `Named`, which owns its own credential
/// location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserKey {
    Default,
    Named(String),
}

impl UserKey {
    /// Build a key from the optional id carried by a request.
    ///
    /// `None`, `""` and [`LOCAL_USER_SENTINEL`] all select the default tenant.
    /// Named ids must be usable as a single path segment.
    pub fn from_request(user_id: Option<&str>) -> Result<Self> {
        match user_id {
            None | Some("") | Some(LOCAL_USER_SENTINEL) => Ok(Self::Default),
            Some(id) => {
                validate_segment(id)?;
                Ok(Self::Named(id.to_string()))
            }
        }
    }

    /// Check if this is the default tenant
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// Named id, `None` for the default tenant
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Named(id) => Some(id),
        }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "{}", LOCAL_USER_SENTINEL),
            Self::Named(id) => write!(f, "{}", id),
        }
    }
}

fn validate_segment(id: &str) -> Result<()> {
    if id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidUser(format!(
            "'{}' cannot be used as a credential location",
            id
        )));
    }
    Ok(())
}
