//! Token and credential primitives for talking to a FOLIO Okapi gateway
//!
//! Okapi authenticates requests with an opaque access token which a client
//! obtains once, by logging in for a specific tenant, and then presents on
//! every request. This crate contains the pieces of that flow which do not
//! depend on any particular HTTP stack:
//!
//! * strongly-typed identifiers for [tenants][Tenant], [usernames][Username],
//!   [user IDs][UserId], and [access tokens][AccessToken], the latter of
//!   which refuses to print itself unless explicitly asked;
//! * [`Credentials`], a short-lived holder of a password that erases itself
//!   once used;
//! * [`TokenCache`], which holds the current token for a connection and
//!   makes sure that concurrent callers finding it empty trigger only one
//!   login.
//!
//! ```
//! use okapi_tokens::{AccessToken, TokenCache};
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let cache = TokenCache::<String>::new();
//!
//! let token = cache
//!     .get_or_fetch(|| async { Ok(AccessToken::from_static("issued-by-okapi")) })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(token.as_str(), "issued-by-okapi");
//! # }
//! ```
//!
//! The request side lives in the `okapi_connection` crate.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
mod cache;
mod credentials;

pub use braids::*;
pub use cache::TokenCache;
pub use credentials::Credentials;
