//! The login exchange that turns credentials into an access token

use std::ops;

use okapi_tokens::{AccessToken, Credentials};
use reqwest::{header, Method, Request};
use zeroize::Zeroizing;

use crate::{AuthenticationError, Connection, JSON_MEDIA_TYPE, X_OKAPI_TENANT, X_OKAPI_TOKEN};

impl Connection {
    /// Logs in with the given credentials and returns the issued access token
    ///
    /// The token is not cached; this is the building block that
    /// [strategies][crate::AuthenticationStrategy] use to produce one.
    ///
    /// The credentials are erased before this returns, whether the login
    /// succeeded or not. Credentials without a username or user ID, or with
    /// a control character that cannot be escaped, are rejected without
    /// contacting the backend.
    #[tracing::instrument(
        err,
        skip_all,
        fields(
            tenant = %self.tenant,
            username = credentials.username().map(|u| u.as_str()),
            user_id = credentials.user_id().map(|u| u.as_str()),
        ),
    )]
    pub async fn login(
        &self,
        credentials: &mut Credentials,
    ) -> Result<AccessToken, AuthenticationError> {
        let credentials = EraseOnExit(credentials);
        let body = encode_login_body(&credentials)?;

        let mut request = Request::new(Method::POST, self.login_url.clone());
        let headers = request.headers_mut();
        headers.insert(X_OKAPI_TENANT, self.tenant_header.clone());
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static(JSON_MEDIA_TYPE),
        );
        *request.body_mut() = Some(body.into());

        tracing::trace!("sending login request");
        let response = self
            .client
            .execute(request)
            .await
            .map_err(AuthenticationError::transport)?;

        tracing::debug!(
            response.status = response.status().as_u16(),
            "received login response"
        );

        if let Some(token) = response.headers().get(X_OKAPI_TOKEN) {
            let token = token
                .to_str()
                .map_err(|_| AuthenticationError::MalformedToken)?;
            if token.is_empty() {
                return Err(AuthenticationError::MalformedToken);
            }

            tracing::info!("logged in");
            return Ok(AccessToken::from(token));
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(AuthenticationError::transport)?;

        Err(AuthenticationError::Rejected { status, body })
    }
}

/// Erases the borrowed credentials when dropped
struct EraseOnExit<'a>(&'a mut Credentials);

impl ops::Deref for EraseOnExit<'_> {
    type Target = Credentials;

    fn deref(&self) -> &Credentials {
        self.0
    }
}

impl Drop for EraseOnExit<'_> {
    fn drop(&mut self) {
        self.0.erase();
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Writes the login body by hand, so that the password is never copied into
/// an intermediate JSON value
///
/// Fields are written in the order `username`, `userId`, `password`, with
/// blank identity fields left out.
///
/// The buffer is allocated once, large enough that escaping never moves it,
/// and is wiped if encoding fails. The returned body is not wiped once the
/// HTTP client is done with it.
pub(crate) fn encode_login_body(
    credentials: &Credentials,
) -> Result<Vec<u8>, AuthenticationError> {
    let username = non_blank(credentials.username().map(|u| u.as_str()));
    let user_id = non_blank(credentials.user_id().map(|u| u.as_str()));

    if username.is_none() && user_id.is_none() {
        return Err(AuthenticationError::MissingIdentity);
    }

    let password = credentials.expose_password();
    let mut body = Zeroizing::new(Vec::with_capacity(login_body_capacity(
        username, user_id, password,
    )));

    body.push(b'{');
    if let Some(username) = username {
        write_field(&mut body, "username", username)?;
        body.push(b',');
    }
    if let Some(user_id) = user_id {
        write_field(&mut body, "userId", user_id)?;
        body.push(b',');
    }
    write_field(&mut body, "password", password)?;
    body.push(b'}');

    Ok(std::mem::take(&mut *body))
}

/// Upper bound on the encoded body length
///
/// Every accepted character that needs escaping is a single byte written as
/// two, so doubling the values covers the worst case.
fn login_body_capacity(username: Option<&str>, user_id: Option<&str>, password: &str) -> usize {
    const FRAMING: usize = r#"{"username":"","userId":"","password":""}"#.len();

    2 * (password.len() + username.map_or(0, str::len) + user_id.map_or(0, str::len)) + FRAMING
}

fn write_field(
    body: &mut Vec<u8>,
    name: &'static str,
    value: &str,
) -> Result<(), AuthenticationError> {
    body.push(b'"');
    body.extend_from_slice(name.as_bytes());
    body.extend_from_slice(b"\":\"");
    escape_into(body, name, value)?;
    body.push(b'"');
    Ok(())
}

fn escape_into(
    body: &mut Vec<u8>,
    field: &'static str,
    value: &str,
) -> Result<(), AuthenticationError> {
    let mut utf8 = [0u8; 4];
    for c in value.chars() {
        let escaped: &[u8] = match c {
            '\\' => b"\\\\",
            '"' => b"\\\"",
            '\u{08}' => b"\\b",
            '\u{0c}' => b"\\f",
            '\n' => b"\\n",
            '\r' => b"\\r",
            '\t' => b"\\t",
            c if (c as u32) < 0x20 => {
                return Err(AuthenticationError::InvalidCharacter { field });
            }
            c => c.encode_utf8(&mut utf8).as_bytes(),
        };
        body.extend_from_slice(escaped);
    }
    utf8.fill(0);
    Ok(())
}
