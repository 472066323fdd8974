//! Test doubles standing in for the Okapi gateway and for strategies

use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use okapi_tokens::AccessToken;
use reqwest::{header::HeaderMap, Method, Request};
use reqwest_middleware::{ClientBuilder, Middleware, Next};
use url::Url;

use crate::{AuthenticationError, AuthenticationStrategy, Connection};

pub const BASE_URL: &str = "https://folio.example/okapi";
pub const TENANT: &str = "diku";

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_login(&self) -> bool {
        self.url.path().ends_with("/authn/login")
    }
}

type Responder = dyn Fn(&RecordedRequest) -> io::Result<http::Response<Vec<u8>>> + Send + Sync;

/// A middleware that answers every request itself, recording what it saw
pub struct Backend {
    responder: Box<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Backend {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&RecordedRequest) -> io::Result<http::Response<Vec<u8>>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Issues `token-1`, `token-2`, … on login and answers everything else with `answer`
    pub fn with_logins<F>(answer: F) -> Arc<Self>
    where
        F: Fn(&RecordedRequest) -> io::Result<http::Response<Vec<u8>>> + Send + Sync + 'static,
    {
        let logins = AtomicUsize::new(0);
        Self::new(move |req| {
            if req.is_login() {
                let n = logins.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(login_accepted(&format!("token-{}", n)))
            } else {
                answer(req)
            }
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn logins(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.is_login()).collect()
    }

    pub fn api_requests(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| !r.is_login()).collect()
    }
}

#[async_trait]
impl Middleware for Backend {
    async fn handle(
        &self,
        req: Request,
        _: &mut http::Extensions,
        _: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let recorded = RecordedRequest {
            method: req.method().clone(),
            url: req.url().clone(),
            headers: req.headers().clone(),
            body: req.body().and_then(|b| b.as_bytes()).map(<[u8]>::to_vec),
        };

        let answer = (self.responder)(&recorded);
        self.requests.lock().unwrap().push(recorded);

        match answer {
            Ok(response) => Ok(response.into()),
            Err(error) => Err(reqwest_middleware::Error::middleware(error)),
        }
    }
}

pub fn respond(status: u16, content_type: Option<&str>, body: &str) -> http::Response<Vec<u8>> {
    let mut builder = http::Response::builder().status(status);
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    builder.body(body.as_bytes().to_vec()).unwrap()
}

pub fn ok_json(body: &str) -> http::Response<Vec<u8>> {
    respond(200, Some("application/json"), body)
}

pub fn login_accepted(token: &str) -> http::Response<Vec<u8>> {
    http::Response::builder()
        .status(201)
        .header("X-Okapi-Token", token)
        .header("content-type", "application/json")
        .body(br#"{"username":"diku_admin"}"#.to_vec())
        .unwrap()
}

pub fn connection_to(
    backend: &Arc<Backend>,
    strategy: impl AuthenticationStrategy + 'static,
) -> Connection {
    let client = ClientBuilder::new(reqwest::Client::new())
        .with_arc(backend.clone())
        .build();

    Connection::builder(Url::parse(BASE_URL).unwrap(), TENANT, strategy)
        .with_client(client)
        .build()
        .unwrap()
}

/// Issues `token-1`, `token-2`, … without touching the network
#[derive(Debug, Default)]
pub struct CountingStrategy {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingStrategy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthenticationStrategy for CountingStrategy {
    async fn obtain_token(&self, _: &Connection) -> Result<AccessToken, AuthenticationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(AccessToken::new(format!("token-{}", n)))
    }
}

/// Fails every time, counting how often it was asked
#[derive(Debug, Default)]
pub struct FailingStrategy {
    calls: AtomicUsize,
}

impl FailingStrategy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthenticationStrategy for FailingStrategy {
    async fn obtain_token(&self, _: &Connection) -> Result<AccessToken, AuthenticationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AuthenticationError::Unavailable {
            reason: "nobody at the keyboard".to_owned(),
        })
    }
}
