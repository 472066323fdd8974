//! Building and validating connections

use std::{fmt, sync::Arc};

use okapi_tokens::{Tenant, TokenCache};
use reqwest::{header::HeaderValue, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use crate::{AuthenticationStrategy, ConfigError, Connection};

/// The path, relative to the base address, of Okapi's login endpoint
pub const DEFAULT_LOGIN_PATH: &str = "authn/login";

/// Statuses that, by default, make a connection log in again and retry
///
/// Okapi answers requests with missing or expired tokens with either of
/// these, depending on the module handling the request.
pub const DEFAULT_REAUTHENTICATION_STATUSES: [StatusCode; 2] =
    [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN];

/// Builder for a [`Connection`]
pub struct ConnectionBuilder {
    base_url: Url,
    tenant: Tenant,
    strategy: Arc<dyn AuthenticationStrategy>,
    client: Option<ClientWithMiddleware>,
    reauthenticate_on: Vec<StatusCode>,
    login_path: String,
}

impl ConnectionBuilder {
    pub(crate) fn new(
        base_url: Url,
        tenant: Tenant,
        strategy: Arc<dyn AuthenticationStrategy>,
    ) -> Self {
        Self {
            base_url,
            tenant,
            strategy,
            client: None,
            reauthenticate_on: DEFAULT_REAUTHENTICATION_STATUSES.to_vec(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
        }
    }

    /// Uses the given client, including its middleware stack, for all requests
    ///
    /// By default, a plain `reqwest` client is used.
    pub fn with_client(mut self, client: ClientWithMiddleware) -> Self {
        self.client = Some(client);
        self
    }

    /// Replaces the statuses which cause the cached token to be discarded and the
    /// request to be retried once
    pub fn with_reauthentication_statuses(
        mut self,
        statuses: impl IntoIterator<Item = StatusCode>,
    ) -> Self {
        self.reauthenticate_on = statuses.into_iter().collect();
        self
    }

    /// Replaces the path of the login endpoint, relative to the base address
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    /// Validates the configuration and constructs the connection
    ///
    /// The base address's path is extended with a trailing `/` if it lacks
    /// one, so that request paths are always resolved below it.
    pub fn build(self) -> Result<Connection, ConfigError> {
        if self.tenant.as_str().trim().is_empty() {
            return Err(ConfigError::BlankTenant);
        }
        let tenant_header =
            HeaderValue::from_str(self.tenant.as_str()).map_err(|_| ConfigError::InvalidTenant)?;

        let mut base_url = self.base_url;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::NotABase(base_url));
        }
        if base_url.query().is_some() || base_url.fragment().is_some() {
            return Err(ConfigError::BaseWithQuery(base_url));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let login_url = base_url
            .join(self.login_path.trim_start_matches('/'))
            .map_err(ConfigError::InvalidLoginPath)?;

        let client = match self.client {
            Some(client) => client,
            None => {
                let client = reqwest::Client::builder()
                    .user_agent(concat!("okapi_connection/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .map_err(ConfigError::Client)?;
                reqwest_middleware::ClientBuilder::new(client).build()
            }
        };

        tracing::debug!(
            base_url = %base_url,
            tenant = %self.tenant,
            login_url = %login_url,
            "constructed connection"
        );

        Ok(Connection {
            base_url,
            login_url,
            tenant: self.tenant,
            tenant_header,
            strategy: self.strategy,
            client,
            reauthenticate_on: self.reauthenticate_on,
            token: TokenCache::new(),
        })
    }
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("base_url", &self.base_url.as_str())
            .field("tenant", &self.tenant)
            .field("strategy", &self.strategy)
            .field("has_custom_client", &self.client.is_some())
            .field("reauthenticate_on", &self.reauthenticate_on)
            .field("login_path", &self.login_path)
            .finish()
    }
}
