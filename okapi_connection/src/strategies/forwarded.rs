//! A strategy fed with tokens obtained elsewhere
//!
//! Some deployments never see a password: a person logs in through the
//! FOLIO web UI and the resulting token is handed over to this process by
//! some other channel. The strategy here is the receiving end of such a
//! hand-over; the transport that delivers the tokens pushes them through a
//! [`TokenForwarder`].

use async_trait::async_trait;
use okapi_tokens::AccessToken;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use super::AuthenticationStrategy;
use crate::{AuthenticationError, Connection};

const FORWARDING_CAPACITY: usize = 8;

#[derive(Debug)]
struct Inbox {
    initial: Option<AccessToken>,
    receiver: mpsc::Receiver<AccessToken>,
}

/// Returns tokens pushed through a paired [`TokenForwarder`]
///
/// An initial token, if given, is used for the first request. After that,
/// each time the connection needs a token this waits until one is
/// forwarded. When several tokens have queued up, the most recent one is
/// used.
#[derive(Debug)]
pub struct ForwardedTokenStrategy {
    inbox: Mutex<Inbox>,
}

/// The sending side of a [`ForwardedTokenStrategy`]
#[derive(Clone, Debug)]
pub struct TokenForwarder {
    sender: mpsc::Sender<AccessToken>,
}

/// The receiving strategy has been dropped
#[derive(Debug, Error)]
#[error("the receiving strategy is gone; the forwarded token was not delivered")]
pub struct TokenForwardingError {
    token: AccessToken,
}

impl TokenForwardingError {
    /// Recovers the token that could not be forwarded
    pub fn into_token(self) -> AccessToken {
        self.token
    }
}

impl ForwardedTokenStrategy {
    /// Constructs a strategy together with the forwarder that feeds it
    pub fn new(initial: Option<AccessToken>) -> (Self, TokenForwarder) {
        let (sender, receiver) = mpsc::channel(FORWARDING_CAPACITY);
        let strategy = Self {
            inbox: Mutex::new(Inbox { initial, receiver }),
        };
        (strategy, TokenForwarder { sender })
    }
}

impl TokenForwarder {
    /// Hands a token to the strategy
    ///
    /// Waits if too many forwarded tokens are still unused.
    pub async fn forward(&self, token: AccessToken) -> Result<(), TokenForwardingError> {
        self.sender
            .send(token)
            .await
            .map_err(|mpsc::error::SendError(token)| TokenForwardingError { token })
    }
}

#[async_trait]
impl AuthenticationStrategy for ForwardedTokenStrategy {
    async fn obtain_token(&self, _: &Connection) -> Result<AccessToken, AuthenticationError> {
        let mut inbox = self.inbox.lock().await;

        if let Some(token) = inbox.initial.take() {
            tracing::debug!("using initial forwarded token");
            return Ok(token);
        }

        tracing::debug!("waiting for a forwarded token");
        let mut token = inbox
            .receiver
            .recv()
            .await
            .ok_or_else(|| AuthenticationError::Unavailable {
                reason: "no token forwarder remains".to_owned(),
            })?;

        while let Ok(newer) = inbox.receiver.try_recv() {
            token = newer;
        }

        tracing::debug!("received forwarded token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_util::*;

    fn connection() -> Connection {
        let backend = Backend::new(|_| Ok(ok_json("{}")));
        connection_to(&backend, CountingStrategy::new())
    }

    #[tokio::test]
    async fn initial_token_is_used_once() {
        let connection = connection();
        let (strategy, forwarder) = ForwardedTokenStrategy::new(Some("initial".into()));

        let first = strategy.obtain_token(&connection).await.unwrap();
        assert_eq!(first.as_str(), "initial");

        forwarder.forward("forwarded".into()).await.unwrap();
        let second = strategy.obtain_token(&connection).await.unwrap();
        assert_eq!(second.as_str(), "forwarded");
    }

    #[tokio::test]
    async fn waits_for_a_forwarded_token() {
        let connection = connection();
        let (strategy, forwarder) = ForwardedTokenStrategy::new(None);

        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            forwarder.forward("late".into()).await.unwrap();
        });

        let token = strategy.obtain_token(&connection).await.unwrap();
        assert_eq!(token.as_str(), "late");
        sender.await.unwrap();
    }

    #[tokio::test]
    async fn most_recent_token_wins() {
        let connection = connection();
        let (strategy, forwarder) = ForwardedTokenStrategy::new(None);

        forwarder.forward("older".into()).await.unwrap();
        forwarder.forward("newer".into()).await.unwrap();

        let token = strategy.obtain_token(&connection).await.unwrap();
        assert_eq!(token.as_str(), "newer");
    }

    #[tokio::test]
    async fn unavailable_once_all_forwarders_are_gone() {
        let connection = connection();
        let (strategy, forwarder) = ForwardedTokenStrategy::new(None);
        drop(forwarder);

        let error = strategy.obtain_token(&connection).await.unwrap_err();
        assert!(matches!(error, AuthenticationError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn forwarding_to_a_dropped_strategy_returns_the_token() {
        let (strategy, forwarder) = ForwardedTokenStrategy::new(None);
        drop(strategy);

        let error = forwarder.forward("orphan".into()).await.unwrap_err();
        assert_eq!(error.into_token().as_str(), "orphan");
    }
}
