//! A strategy that hands out one pre-issued token

use async_trait::async_trait;
use okapi_tokens::AccessToken;

use super::AuthenticationStrategy;
use crate::{AuthenticationError, Connection};

/// Always returns the same, already issued, access token
///
/// Once the backend rejects the token, every retry yields the same
/// rejection; this strategy never recovers on its own.
#[derive(Clone, Debug)]
pub struct FixedTokenStrategy {
    token: AccessToken,
}

impl FixedTokenStrategy {
    /// Constructs a new fixed token strategy
    pub fn new(token: impl Into<AccessToken>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AuthenticationStrategy for FixedTokenStrategy {
    async fn obtain_token(&self, _: &Connection) -> Result<AccessToken, AuthenticationError> {
        Ok(self.token.clone())
    }
}
