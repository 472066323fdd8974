//! The connection and its request executor

use std::{fmt, sync::Arc};

use bytes::Bytes;
use okapi_tokens::{AccessToken, Tenant, TenantRef, TokenCache};
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, Request, StatusCode,
};
use reqwest_middleware::ClientWithMiddleware;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    AuthenticationError, AuthenticationStrategy, ConfigError, ConnectionBuilder, ConnectionError,
    Response, JSON_MEDIA_TYPE,
};

/// The header carrying the access token
pub const X_OKAPI_TOKEN: HeaderName = HeaderName::from_static("x-okapi-token");

/// The header carrying the tenant
pub const X_OKAPI_TENANT: HeaderName = HeaderName::from_static("x-okapi-tenant");

/// A request is sent at most this many times: once, and once more after
/// logging in again
const MAX_ATTEMPTS: u32 = 2;

/// A connection to one tenant of an Okapi gateway
///
/// The connection logs in lazily, on the first request, using its
/// [`AuthenticationStrategy`], and keeps the resulting access token for
/// subsequent requests. When the backend rejects the token, the connection
/// discards it, logs in again, and retries the request once.
///
/// A connection can be shared between tasks (for example in an [`Arc`]).
/// Only obtaining the token is serialized; requests themselves run
/// concurrently.
pub struct Connection {
    pub(crate) base_url: Url,
    pub(crate) login_url: Url,
    pub(crate) tenant: Tenant,
    pub(crate) tenant_header: HeaderValue,
    pub(crate) strategy: Arc<dyn AuthenticationStrategy>,
    pub(crate) client: ClientWithMiddleware,
    pub(crate) reauthenticate_on: Vec<StatusCode>,
    pub(crate) token: TokenCache<AuthenticationError>,
}

impl Connection {
    /// Starts building a connection for `tenant` at `base_url`
    pub fn builder(
        base_url: Url,
        tenant: impl Into<Tenant>,
        strategy: impl AuthenticationStrategy + 'static,
    ) -> ConnectionBuilder {
        ConnectionBuilder::new(base_url, tenant.into(), Arc::new(strategy))
    }

    /// Constructs a connection with the default configuration
    pub fn new(
        base_url: Url,
        tenant: impl Into<Tenant>,
        strategy: impl AuthenticationStrategy + 'static,
    ) -> Result<Self, ConfigError> {
        Self::builder(base_url, tenant, strategy).build()
    }

    /// The base address that request paths are appended to
    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The tenant this connection acts for
    #[inline]
    pub fn tenant(&self) -> &TenantRef {
        &self.tenant
    }

    /// Returns the cached access token, obtaining one from the strategy if
    /// there is none
    ///
    /// Concurrent callers finding no token share one invocation of the
    /// strategy and all receive its result.
    pub async fn ensure_token(&self) -> Result<AccessToken, AuthenticationError> {
        self.token
            .get_or_fetch(|| async {
                let token = self.strategy.obtain_token(self).await?;
                if token.is_empty() || HeaderValue::from_str(token.as_str()).is_err() {
                    return Err(AuthenticationError::MalformedToken);
                }
                tracing::info!(tenant = %self.tenant, "obtained new access token");
                Ok(token)
            })
            .await
    }

    /// Discards the cached access token
    ///
    /// The next request obtains a new token from the strategy.
    pub async fn invalidate_token(&self) {
        self.token.invalidate().await;
    }

    /// Sends a `GET` request
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<Response, ConnectionError> {
        self.request(Method::GET, path, query, None, headers, None)
            .await
    }

    /// Sends a `DELETE` request
    pub async fn delete(
        &self,
        path: &str,
        query: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<Response, ConnectionError> {
        self.request(Method::DELETE, path, query, None, headers, None)
            .await
    }

    /// Sends a `POST` request with an arbitrary body
    ///
    /// Query parameters, if needed, must be part of `path` and escaped by
    /// the caller.
    pub async fn post(
        &self,
        path: &str,
        content_type: Option<&str>,
        headers: &HeaderMap,
        body: impl Into<Bytes>,
    ) -> Result<Response, ConnectionError> {
        self.request(Method::POST, path, &[], content_type, headers, Some(body.into()))
            .await
    }

    /// Sends a `PUT` request with an arbitrary body
    ///
    /// Query parameters, if needed, must be part of `path` and escaped by
    /// the caller.
    pub async fn put(
        &self,
        path: &str,
        content_type: Option<&str>,
        headers: &HeaderMap,
        body: impl Into<Bytes>,
    ) -> Result<Response, ConnectionError> {
        self.request(Method::PUT, path, &[], content_type, headers, Some(body.into()))
            .await
    }

    /// Sends a `GET` request and deserializes the JSON response
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<T, ConnectionError> {
        let response = self.get(path, query, headers).await?;
        decode_json(path, &response)
    }

    /// Sends a JSON body with a `POST` request and deserializes the JSON response
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> Result<T, ConnectionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body).map_err(ConnectionError::Serialize)?;
        let response = self
            .post(path, Some(JSON_MEDIA_TYPE), headers, body)
            .await?;
        decode_json(path, &response)
    }

    /// Sends a JSON body with a `PUT` request and deserializes the JSON response
    pub async fn put_json<B, T>(
        &self,
        path: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> Result<T, ConnectionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body).map_err(ConnectionError::Serialize)?;
        let response = self.put(path, Some(JSON_MEDIA_TYPE), headers, body).await?;
        decode_json(path, &response)
    }

    /// Sends an authenticated request
    ///
    /// `headers` are applied first; `X-Okapi-Token` and `X-Okapi-Tenant`
    /// always carry the connection's own values, whatever `headers` says.
    /// `Content-Type` is set only if `content_type` is given. The body is
    /// sent only for `POST` and `PUT`.
    ///
    /// Only a `200 OK` is a success. If the backend rejects the token, the
    /// token is discarded and the request is sent once more with a new one;
    /// a second rejection, any other status, or a transport failure is
    /// reported as an error.
    #[tracing::instrument(
        err,
        skip(self, query, headers, content_type, body),
        fields(tenant = %self.tenant),
    )]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        content_type: Option<&str>,
        headers: &HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Response, ConnectionError> {
        let url = self.target_url(path, query)?;
        let content_type = content_type
            .map(|ct| {
                HeaderValue::from_str(ct).map_err(|_| ConnectionError::InvalidHeader {
                    name: header::CONTENT_TYPE,
                })
            })
            .transpose()?;
        let body = body.filter(|b| !b.is_empty() && permits_body(&method));

        let mut attempt = 1;
        loop {
            let token = self.ensure_token().await?;

            let mut request = Request::new(method.clone(), url.clone());
            *request.headers_mut() = headers.clone();
            self.authorize(request.headers_mut(), &token)?;
            if let Some(ct) = &content_type {
                request.headers_mut().insert(header::CONTENT_TYPE, ct.clone());
            }
            if let Some(body) = &body {
                *request.body_mut() = Some(body.clone().into());
            }

            tracing::trace!(attempt, "sending request");
            let response = self
                .client
                .execute(request)
                .await
                .map_err(|source| transport_failure(path, source))?;

            let status = response.status();
            tracing::debug!(
                attempt,
                response.status = status.as_u16(),
                "received response"
            );

            if status == StatusCode::OK {
                return Response::read(response)
                    .await
                    .map_err(|source| transport_failure(path, source.into()));
            }

            if self.reauthenticate_on.contains(&status) {
                tracing::warn!(
                    attempt,
                    response.status = status.as_u16(),
                    "backend rejected access token"
                );
                self.invalidate_token().await;

                if attempt < MAX_ATTEMPTS {
                    attempt += 1;
                    continue;
                }
            }

            let body = response
                .text()
                .await
                .map_err(|source| transport_failure(path, source.into()))?;

            return Err(ConnectionError::Status {
                path: path.to_owned(),
                status,
                body,
            });
        }
    }

    fn authorize(&self, headers: &mut HeaderMap, token: &AccessToken) -> Result<(), ConnectionError> {
        let mut token_value =
            HeaderValue::from_str(token.as_str()).map_err(|_| AuthenticationError::MalformedToken)?;
        token_value.set_sensitive(true);

        headers.insert(X_OKAPI_TOKEN, token_value);
        headers.insert(X_OKAPI_TENANT, self.tenant_header.clone());
        Ok(())
    }

    /// Appends `path` and the encoded `query` to the base address
    ///
    /// Each query pair is written as `key=value`, both form-urlencoded. The
    /// first pair is introduced by `?`, unless `path` already carries a
    /// query, in which case all pairs are joined with `&`.
    pub(crate) fn target_url(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Url, ConnectionError> {
        let mut target = String::from(self.base_url.as_str());
        target.push_str(path.trim_start_matches('/'));

        let mut delimiter = if path.contains('?') { '&' } else { '?' };
        for (key, value) in query {
            target.push(delimiter);
            target.extend(url::form_urlencoded::byte_serialize(key.as_bytes()));
            target.push('=');
            target.extend(url::form_urlencoded::byte_serialize(value.as_bytes()));
            delimiter = '&';
        }

        Url::parse(&target).map_err(|source| ConnectionError::InvalidUrl {
            path: path.to_owned(),
            source,
        })
    }
}

fn permits_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT
}

fn transport_failure(path: &str, source: reqwest_middleware::Error) -> ConnectionError {
    ConnectionError::Transport {
        path: path.to_owned(),
        source,
    }
}

fn decode_json<T: DeserializeOwned>(path: &str, response: &Response) -> Result<T, ConnectionError> {
    response.json().map_err(|source| ConnectionError::Body {
        path: path.to_owned(),
        source,
    })
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url.as_str())
            .field("tenant", &self.tenant)
            .field("strategy", &self.strategy)
            .field("reauthenticate_on", &self.reauthenticate_on)
            .field("token", &self.token)
            .finish()
    }
}
