//! Strategies that log in with a username or user ID and a password

use std::fmt;

use async_trait::async_trait;
use okapi_tokens::{AccessToken, Credentials, UserId, Username};
use zeroize::Zeroizing;

use super::AuthenticationStrategy;
use crate::{AuthenticationError, Connection};

/// A source of fresh credentials for each login attempt
///
/// This is the seam for prompting a person, whether on a terminal or in a
/// dialog. Each call must produce a new [`Credentials`] value, which the
/// caller erases once the login is done.
#[async_trait]
pub trait CredentialsSource: fmt::Debug + Send + Sync {
    /// Produces credentials for logging in to `connection`
    async fn credentials(&self, connection: &Connection) -> Result<Credentials, AuthenticationError>;
}

/// Obtains tokens by logging in with credentials from a [`CredentialsSource`]
#[derive(Debug)]
pub struct LoginStrategy<S> {
    source: S,
}

impl<S: CredentialsSource> LoginStrategy<S> {
    /// Constructs a new login strategy
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: CredentialsSource> AuthenticationStrategy for LoginStrategy<S> {
    async fn obtain_token(&self, connection: &Connection) -> Result<AccessToken, AuthenticationError> {
        let mut credentials = self.source.credentials(connection).await?;
        let token = connection.login(&mut credentials).await;
        credentials.erase();
        token
    }
}

/// Credentials held in memory for the life of the strategy
///
/// Each login attempt receives a fresh copy which is erased after use. The
/// stored password itself is only wiped when this value is dropped, so
/// prefer a prompting source where that matters.
pub struct FixedCredentials {
    username: Option<Username>,
    user_id: Option<UserId>,
    password: Zeroizing<String>,
}

impl FixedCredentials {
    /// Constructs a new fixed credentials source
    pub fn new(username: Option<Username>, user_id: Option<UserId>, password: String) -> Self {
        Self {
            username,
            user_id,
            password: Zeroizing::new(password),
        }
    }

    /// Shortcut for a [`LoginStrategy`] logging in by username
    pub fn login_with_username(
        username: impl Into<Username>,
        password: String,
    ) -> LoginStrategy<Self> {
        LoginStrategy::new(Self::new(Some(username.into()), None, password))
    }
}

#[async_trait]
impl CredentialsSource for FixedCredentials {
    async fn credentials(&self, _: &Connection) -> Result<Credentials, AuthenticationError> {
        Ok(Credentials::new(
            self.username.clone(),
            self.user_id.clone(),
            String::clone(&self.password),
        ))
    }
}

impl fmt::Debug for FixedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FixedCredentials")
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("password", &"***PASSWORD***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderMap;

    use super::*;
    use crate::test_util::*;

    #[tokio::test]
    async fn each_token_comes_from_a_new_login() {
        let backend = Backend::with_logins(|_| Ok(ok_json("{}")));
        let connection = connection_to(
            &backend,
            FixedCredentials::login_with_username("diku_admin", "admin".to_owned()),
        );

        let first = connection.ensure_token().await.unwrap();
        connection.invalidate_token().await;
        let second = connection.ensure_token().await.unwrap();

        assert_eq!(first.as_str(), "token-1");
        assert_eq!(second.as_str(), "token-2");
        let logins = backend.logins();
        assert_eq!(logins.len(), 2);
        assert!(logins.iter().all(|r| r.body.as_deref()
            == Some(&br#"{"username":"diku_admin","password":"admin"}"#[..])));
    }

    #[tokio::test]
    async fn failed_login_surfaces_through_requests() {
        let backend = Backend::new(|_| Ok(respond(422, Some("text/plain"), "bad credentials")));
        let connection = connection_to(
            &backend,
            FixedCredentials::login_with_username("diku_admin", "wrong".to_owned()),
        );

        let result = connection.get("/items", &[], &HeaderMap::new()).await;

        assert!(matches!(
            result,
            Err(crate::ConnectionError::Authentication(
                AuthenticationError::Rejected { .. }
            ))
        ));
        assert_eq!(backend.api_requests().len(), 0);
    }

    #[test]
    fn debug_hides_password() {
        let source = FixedCredentials::new(Some("diku_admin".into()), None, "hunter2".to_owned());
        let rendered = format!("{:?}", source);
        assert!(rendered.contains("diku_admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
