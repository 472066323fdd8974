//! Errors reported by connections and authentication strategies

use std::{error, sync::Arc};

use reqwest::{header::HeaderName, StatusCode};
use thiserror::Error;

/// An error while obtaining an access token
///
/// This type is cheap to clone so that one failed login can be reported to
/// every caller that was waiting on it. It never carries a password.
#[derive(Clone, Debug, Error)]
pub enum AuthenticationError {
    /// Neither a username nor a user ID was supplied
    #[error("either a username or a user ID must be given to log in")]
    MissingIdentity,
    /// A credential field contains a control character that cannot be sent
    #[error("{field} contains a control character that is not allowed in credentials")]
    InvalidCharacter {
        /// The credential field containing the character
        field: &'static str,
    },
    /// The login endpoint did not issue a token
    #[error("login failed with HTTP code {status}: {body}")]
    Rejected {
        /// The status returned by the login endpoint
        status: StatusCode,
        /// The error body returned by the login endpoint
        body: String,
    },
    /// The login request could not be sent or its response could not be read
    #[error("unable to reach the login endpoint")]
    Transport(#[source] Arc<reqwest_middleware::Error>),
    /// A token was issued, but it was empty or not a valid header value
    #[error("the issued access token is empty or malformed")]
    MalformedToken,
    /// The strategy has no way left to produce a token
    #[error("no access token available: {reason}")]
    Unavailable {
        /// Why no token can be produced
        reason: String,
    },
    /// An application-defined strategy failed
    #[error("authentication strategy failed")]
    Strategy(#[source] Arc<dyn error::Error + Send + Sync + 'static>),
}

impl AuthenticationError {
    /// Wraps an application-specific failure
    pub fn strategy<E>(error: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        Self::Strategy(Arc::new(error))
    }

    pub(crate) fn transport(error: impl Into<reqwest_middleware::Error>) -> Self {
        Self::Transport(Arc::new(error.into()))
    }
}

/// An error while making a request through a connection
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No access token could be obtained for the request
    #[error("unable to authenticate with the backend")]
    Authentication(#[from] AuthenticationError),
    /// The request could not be sent or its response could not be read
    #[error("request for path {path} failed")]
    Transport {
        /// The requested path
        path: String,
        /// The underlying transport error
        #[source]
        source: reqwest_middleware::Error,
    },
    /// The backend answered with something other than success
    #[error("request for path {path} failed with HTTP code {status}: {body}")]
    Status {
        /// The requested path
        path: String,
        /// The status returned by the backend
        status: StatusCode,
        /// The error body returned by the backend
        body: String,
    },
    /// The path and query do not form a valid address below the base address
    #[error("request for path {path} does not form a valid address")]
    InvalidUrl {
        /// The requested path
        path: String,
        /// The parse failure
        #[source]
        source: url::ParseError,
    },
    /// A header value supplied for the request is not a valid header value
    #[error("invalid value for header {name}")]
    InvalidHeader {
        /// The offending header
        name: HeaderName,
    },
    /// The response body did not have the expected shape
    #[error("unexpected response body for path {path}")]
    Body {
        /// The requested path
        path: String,
        /// The reason the body was rejected
        #[source]
        source: BodyError,
    },
    /// The request body could not be serialized
    #[error("unable to serialize request body")]
    Serialize(#[source] serde_json::Error),
}

/// An error interpreting a response body
#[derive(Debug, Error)]
pub enum BodyError {
    /// The response is not declared as JSON
    #[error("expected a JSON response, found content type {content_type:?}")]
    NotJson {
        /// The declared content type, if any
        content_type: Option<String>,
    },
    /// The response is declared as JSON but could not be deserialized
    #[error("malformed JSON response")]
    Malformed(#[from] serde_json::Error),
}

/// An error while building a connection
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The tenant is empty or blank
    #[error("tenant must not be blank")]
    BlankTenant,
    /// The tenant cannot be sent as a header value
    #[error("tenant is not a valid header value")]
    InvalidTenant,
    /// The base address cannot have paths appended to it
    #[error("base address {0} cannot be used as a base")]
    NotABase(url::Url),
    /// The base address carries a query or fragment, which request paths
    /// could not be appended after
    #[error("base address {0} must not have a query or fragment")]
    BaseWithQuery(url::Url),
    /// The login path does not form a valid address below the base address
    #[error("invalid login path")]
    InvalidLoginPath(#[source] url::ParseError),
    /// The default HTTP client could not be constructed
    #[error("unable to construct HTTP client")]
    Client(#[source] reqwest::Error),
}
