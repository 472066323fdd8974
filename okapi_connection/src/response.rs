//! Responses read in full from the backend

use std::borrow::Cow;

use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap},
    StatusCode,
};
use serde::de::DeserializeOwned;

use crate::BodyError;

/// The media type used for JSON bodies
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A fully-read response from the backend
///
/// The body is kept as raw bytes; no assumption is made about it being
/// text or JSON until one of the accessors is asked to interpret it.
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    content_type: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Assembles a response from its parts
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);

        Self {
            status,
            content_type,
            headers,
            body,
        }
    }

    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::from_parts(status, headers, body))
    }

    /// The HTTP status code
    #[inline]
    pub fn http_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The HTTP status
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The declared content type, if any
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// All response headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The values of one header, in the order they were received
    ///
    /// Values that are not visible ASCII are skipped.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// The raw body
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Takes ownership of the raw body
    #[inline]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// The body as UTF-8 text, replacing invalid sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether the declared content type is JSON
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map_or(false, |media| media.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
    }

    /// Deserializes the body as JSON
    ///
    /// Fails without looking at the body if the response is not declared as
    /// `application/json`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        if !self.is_json() {
            return Err(BodyError::NotJson {
                content_type: self.content_type.clone(),
            });
        }

        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    fn response_with(content_type: Option<&'static str>, body: &'static str) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        Response::from_parts(StatusCode::OK, headers, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn json_body_is_deserialized() {
        let response = response_with(Some("application/json"), r#"{"id":"42"}"#);
        let item: Item = response.json().unwrap();
        assert_eq!(item, Item { id: "42".into() });
    }

    #[test]
    fn json_with_charset_parameter_is_accepted() {
        let response = response_with(Some("Application/JSON; charset=utf-8"), r#"{"id":"7"}"#);
        assert!(response.is_json());
        assert!(response.json::<Item>().is_ok());
    }

    #[test]
    fn text_body_is_not_deserialized() {
        let response = response_with(Some("text/plain"), r#"{"id":"42"}"#);
        match response.json::<Item>() {
            Err(BodyError::NotJson { content_type }) => {
                assert_eq!(content_type.as_deref(), Some("text/plain"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_content_type_is_not_json() {
        let response = response_with(None, "{}");
        assert!(!response.is_json());
        assert_eq!(response.content_type(), None);
    }

    #[test]
    fn repeated_headers_keep_their_order() {
        let mut headers = HeaderMap::new();
        headers.append("x-trace", HeaderValue::from_static("first"));
        headers.append("x-trace", HeaderValue::from_static("second"));
        let response = Response::from_parts(StatusCode::OK, headers, Bytes::new());

        assert_eq!(response.header_values("X-Trace"), vec!["first", "second"]);
        assert!(response.header_values("x-missing").is_empty());
    }

    #[test]
    fn text_replaces_invalid_utf8() {
        let response = Response::from_parts(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"ok \xff"),
        );
        assert_eq!(response.text(), "ok \u{fffd}");
        assert_eq!(response.http_code(), 200);
    }
}
