use super::api::{ApiResponse, GitHubApi, RateLimitInfo};
use crate::Result;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use ohno::bail;
use std::sync::Mutex;

const LOG_TARGET: &str = "      pool";

/// Quota GitHub grants an authenticated token per hour.
pub const GITHUB_RATE_LIMIT_AUTHENTICATED: usize = 5000;

/// Quota GitHub grants an anonymous caller per hour.
pub const GITHUB_RATE_LIMIT_UNAUTHENTICATED: usize = 60;

/// Below this remaining quota the pool prefers whichever client recovers first.
pub const DEFAULT_LOW_QUOTA_THRESHOLD: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Quota {
    remaining: usize,
    reset_at: DateTime<Utc>,
}

/// One credentialed client plus its last known quota.
#[derive(Debug)]
pub struct ManagedClient<A> {
    api: A,
    label: String,
    quota: Mutex<Quota>,
}

impl<A> ManagedClient<A> {
    /// Wrap `api`, assuming `remaining` calls are left until `reset_at`.
    pub fn new(api: A, label: impl Into<String>, remaining: usize, reset_at: DateTime<Utc>) -> Self {
        Self {
            api,
            label: label.into(),
            quota: Mutex::new(Quota { remaining, reset_at }),
        }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.quota.lock().expect("lock poisoned").remaining
    }

    #[must_use]
    pub fn reset_at(&self) -> DateTime<Utc> {
        self.quota.lock().expect("lock poisoned").reset_at
    }

    fn update(&self, remaining: usize, reset_at: DateTime<Utc>) {
        *self.quota.lock().expect("lock poisoned") = Quota { remaining, reset_at };
    }
}

/// Set of API clients, each tracked with its own quota.
///
/// Selection is advisory: quotas are updated after calls complete, so concurrent
/// callers may still land on a client that has just run dry. Callers treat a
/// rate-limited response as a skipped unit of work.
#[derive(Debug)]
pub struct ClientPool<A> {
    clients: Vec<ManagedClient<A>>,
    low_quota_threshold: usize,
}

impl<A: GitHubApi> ClientPool<A> {
    pub fn new(clients: Vec<ManagedClient<A>>, low_quota_threshold: usize) -> Result<Self> {
        if clients.is_empty() {
            bail!("a client pool needs at least one client");
        }

        Ok(Self {
            clients,
            low_quota_threshold,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn clients(&self) -> impl Iterator<Item = &ManagedClient<A>> {
        self.clients.iter()
    }

    /// Pick the client to use for the next call.
    ///
    /// The client with the most remaining quota wins. When even that one is below the
    /// low-quota threshold, the client whose quota resets soonest is picked instead.
    pub fn select(&self) -> &ManagedClient<A> {
        let (first, rest) = self.clients.split_first().expect("pool is never empty");
        if rest.is_empty() {
            return first;
        }

        let best = rest
            .iter()
            .fold(first, |best, client| if client.remaining() > best.remaining() { client } else { best });

        if best.remaining() >= self.low_quota_threshold {
            return best;
        }

        rest.iter()
            .fold(first, |soonest, client| if client.reset_at() < soonest.reset_at() { client } else { soonest })
    }

    /// Store the quota reported by the latest call made through `client`.
    pub fn record_usage(&self, client: &ManagedClient<A>, remaining: usize, reset_at: DateTime<Utc>) {
        client.update(remaining, reset_at);
        log::trace!(target: LOG_TARGET, "{}: {remaining} calls left, resets at {reset_at}", client.label());
    }

    /// Convenience wrapper for responses that may carry rate limit info.
    pub fn record(&self, client: &ManagedClient<A>, rate_limit: Option<RateLimitInfo>) {
        if let Some(info) = rate_limit {
            self.record_usage(client, info.remaining, info.reset_at);
        }
    }

    /// Ask every client for its actual quota instead of relying on the initial estimate.
    ///
    /// Failures leave the estimate in place.
    pub async fn prime(&self) {
        let responses = join_all(self.clients.iter().map(|client| async move { (client, client.api().rate_limit().await) })).await;

        for (client, response) in responses {
            match response {
                ApiResponse::Success(info, _) | ApiResponse::RateLimited(info) => {
                    self.record_usage(client, info.remaining, info.reset_at);
                    log::info!(
                        target: LOG_TARGET,
                        "{}: {} calls remaining until {}",
                        client.label(),
                        info.remaining,
                        info.reset_at.with_timezone(&chrono::Local).format("%T")
                    );
                }
                ApiResponse::NotFound(_) => {
                    log::debug!(target: LOG_TARGET, "{}: rate limit endpoint not available", client.label());
                }
                ApiResponse::Failed(e, _) => {
                    log::warn!(target: LOG_TARGET, "Could not query rate limit for {}: {e:#}", client.label());
                }
            }
        }
    }
}
