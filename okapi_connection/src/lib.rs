//! Authenticated requests against a FOLIO Okapi gateway
//!
//! A [`Connection`] talks to one tenant of one Okapi instance. It takes care
//! of authentication on its own: the first request triggers a login through
//! the connection's [`AuthenticationStrategy`], the resulting token is kept
//! and sent as `X-Okapi-Token` with every request, and when the backend
//! rejects it the connection logs in again and retries the request once.
//!
//! ```
//! use okapi_connection::{strategies::FixedCredentials, Connection};
//! use reqwest::header::HeaderMap;
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let connection = Connection::new(
//!     "https://folio-snapshot-okapi.dev.folio.org".parse()?,
//!     "diku",
//!     FixedCredentials::login_with_username("diku_admin", "admin".to_owned()),
//! )?;
//!
//! let response = connection
//!     .get("/users", &[("query", "active==true"), ("limit", "10")], &HeaderMap::new())
//!     .await?;
//!
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Strategies
//!
//! How a token is obtained is up to the [strategy][strategies]:
//!
//! * [`FixedTokenStrategy`][strategies::FixedTokenStrategy] uses a token
//!   issued beforehand;
//! * [`LoginStrategy`][strategies::LoginStrategy] logs in with credentials
//!   from a [`CredentialsSource`][strategies::CredentialsSource], such as a
//!   prompt or [`FixedCredentials`][strategies::FixedCredentials];
//! * [`ForwardedTokenStrategy`][strategies::ForwardedTokenStrategy] waits for
//!   tokens handed over from elsewhere, for example from a browser session.
//!
//! Credentials are erased as soon as the login they were gathered for is
//! over, whether it succeeded or not.
//!
//! # Features
//!
//! * `default-tls` (default): TLS through the platform's native library.
//! * `rustls-tls`: TLS through `rustls`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod config;
mod connection;
mod error;
mod login;
mod response;
pub mod strategies;

#[cfg(test)]
mod test_util;

pub use config::{ConnectionBuilder, DEFAULT_LOGIN_PATH, DEFAULT_REAUTHENTICATION_STATUSES};
pub use connection::{Connection, X_OKAPI_TENANT, X_OKAPI_TOKEN};
pub use error::{AuthenticationError, BodyError, ConfigError, ConnectionError};
pub use okapi_tokens::{
    AccessToken, AccessTokenRef, Credentials, Tenant, TenantRef, UserId, UserIdRef, Username,
    UsernameRef,
};
pub use response::{Response, JSON_MEDIA_TYPE};
pub use strategies::AuthenticationStrategy;
