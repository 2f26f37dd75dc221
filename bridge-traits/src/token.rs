//! Correlation tokens shared by the core and every host adapter.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier binding an asynchronous host result to the request that
/// caused it.
///
/// The core hands a token to the host with every fire-and-forget call; the
/// host must attach the same token to the [`HostEvent`](crate::events::HostEvent)
/// that reports the outcome. Tokens are random, so a result produced for a
/// previous process incarnation can never match a fresh operation.
///
/// # Examples
///
/// ```
/// use bridge_traits::CorrelationToken;
///
/// let token = CorrelationToken::new();
/// let parsed = CorrelationToken::from_string(&token.to_string()).unwrap();
/// assert_eq!(token, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    /// Create a new random token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token from its string form
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(CorrelationToken::new(), CorrelationToken::new());
    }

    #[test]
    fn test_from_string_rejects_garbage() {
        assert!(CorrelationToken::from_string("not-a-token").is_err());
    }
}
