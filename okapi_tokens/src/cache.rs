//! A single-flight cache for the access token of one connection

use std::{
    fmt,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::sync::Mutex;

use crate::AccessToken;

struct CacheState<E> {
    token: Option<AccessToken>,
    last_failure: Option<(u64, E)>,
}

/// Holds at most one access token and coordinates fetching a new one
///
/// Reading, fetching, and storing the token happen inside one critical
/// section. When the cache is empty, the first caller to get in runs the
/// fetch while everyone else waits; the waiters then receive the same
/// token (or the same error) instead of fetching again.
///
/// A failed fetch leaves the cache empty. Callers that were already waiting
/// when the fetch failed receive a clone of that error. Callers that arrive
/// afterwards start a new fetch.
pub struct TokenCache<E> {
    state: Mutex<CacheState<E>>,
    settled: AtomicU64,
}

impl<E> Default for TokenCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TokenCache<E> {
    /// Constructs a new, empty cache
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                token: None,
                last_failure: None,
            }),
            settled: AtomicU64::new(0),
        }
    }

    /// Discards the cached token, if any
    ///
    /// Returns whether a token was present. If a fetch is in progress, this
    /// waits for it to install its token and then discards that token.
    pub async fn invalidate(&self) -> bool {
        let mut state = self.state.lock().await;
        let had_token = state.token.take().is_some();
        if had_token {
            tracing::debug!("discarded cached token");
        }
        had_token
    }

    /// Returns the cached token without fetching
    pub async fn cached(&self) -> Option<AccessToken> {
        self.state.lock().await.token.clone()
    }
}

impl<E: Clone> TokenCache<E> {
    /// Returns the cached token, running `fetch` to obtain one if the cache is empty
    ///
    /// `fetch` runs with the cache locked, so it is invoked at most once for
    /// any number of concurrent callers finding the cache empty.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<AccessToken, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, E>>,
    {
        let arrived_at = self.settled.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if let Some(token) = &state.token {
            return Ok(token.clone());
        }

        if let Some((episode, error)) = &state.last_failure {
            if *episode > arrived_at {
                tracing::debug!(episode, "token fetch failed while waiting, reusing its error");
                return Err(error.clone());
            }
        }

        tracing::debug!("no cached token, fetching a new one");
        let result = fetch().await;
        let episode = self.settled.fetch_add(1, Ordering::AcqRel) + 1;

        match &result {
            Ok(token) => {
                tracing::debug!(episode, "cached new token");
                state.token = Some(token.clone());
                state.last_failure = None;
            }
            Err(error) => {
                tracing::debug!(episode, "token fetch failed, cache remains empty");
                state.last_failure = Some((episode, error.clone()));
            }
        }

        result
    }
}

impl<E> fmt::Debug for TokenCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut dbg = f.debug_struct("TokenCache");
        match self.state.try_lock() {
            Ok(state) => dbg.field("has_token", &state.token.is_some()),
            Err(_) => dbg.field("has_token", &"<locked>"),
        };
        dbg.field("settled", &self.settled.load(Ordering::Relaxed))
            .finish()
    }
}
