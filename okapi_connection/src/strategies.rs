//! Authentication strategies

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use okapi_tokens::AccessToken;

use crate::{AuthenticationError, Connection};

pub mod credentials;
pub mod fixed;
pub mod forwarded;

pub use credentials::{CredentialsSource, FixedCredentials, LoginStrategy};
pub use fixed::FixedTokenStrategy;
pub use forwarded::{ForwardedTokenStrategy, TokenForwarder, TokenForwardingError};

/// A way of obtaining an access token for a connection
///
/// A connection calls this whenever it has no token, at most once at a time.
/// The returned token must be valid at the moment it is returned.
///
/// Implementations that gather credentials must exchange them through
/// [`Connection::login()`] and must not keep the password around afterwards.
/// Implementations holding an already-issued token may return it directly.
///
/// Obtaining a token may take a long time, for example when waiting for a
/// person to enter a password. The connection's token cache stays locked
/// for as long as this runs.
#[async_trait]
pub trait AuthenticationStrategy: fmt::Debug + Send + Sync {
    /// Produces an access token for `connection`
    async fn obtain_token(&self, connection: &Connection) -> Result<AccessToken, AuthenticationError>;
}

#[async_trait]
impl<S: AuthenticationStrategy + ?Sized> AuthenticationStrategy for Arc<S> {
    async fn obtain_token(&self, connection: &Connection) -> Result<AccessToken, AuthenticationError> {
        (**self).obtain_token(connection).await
    }
}

#[async_trait]
impl<S: AuthenticationStrategy + ?Sized> AuthenticationStrategy for Box<S> {
    async fn obtain_token(&self, connection: &Connection) -> Result<AccessToken, AuthenticationError> {
        (**self).obtain_token(connection).await
    }
}
