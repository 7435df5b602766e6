use super::api::{ApiResponse, GitHubApi, Page, RepoName, RepoSummary};
use super::client_pool::ClientPool;
use super::pacer::Pacer;
use super::{AccountProfile, DiscoveredRelation, RelationKind};
use crate::Result;
use core::sync::atomic::{AtomicU64, Ordering};
use ohno::{EnrichableExt, bail};
use serde::Serialize;
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "   fetcher";

/// Running totals of the calls issued during a crawl
#[derive(Debug, Default)]
pub struct FetchStats {
    api_calls: AtomicU64,
    failed_calls: AtomicU64,
    rate_limited_calls: AtomicU64,
    profiles_fetched: AtomicU64,
}

/// Point-in-time copy of [`FetchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub api_calls: u64,
    pub failed_calls: u64,
    pub rate_limited_calls: u64,
    pub profiles_fetched: u64,
}

impl FetchStats {
    #[must_use]
    pub fn summary(&self) -> FetchSummary {
        FetchSummary {
            api_calls: self.api_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            rate_limited_calls: self.rate_limited_calls.load(Ordering::Relaxed),
            profiles_fetched: self.profiles_fetched.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        let _ = counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Turns page-level API operations into complete relation sets.
///
/// Every call waits on the shared [`Pacer`], goes through the client picked by the
/// [`ClientPool`] and reports the quota it observed back to the pool. Failures of any
/// kind produce an empty result: a broken listing must never abort the crawl.
#[derive(Debug)]
pub struct RelationFetcher<A> {
    pool: ClientPool<A>,
    pacer: Pacer,
    cancel: CancellationToken,
    stats: FetchStats,
}

impl<A: GitHubApi> RelationFetcher<A> {
    #[must_use]
    pub fn new(pool: ClientPool<A>, pacer: Pacer, cancel: CancellationToken) -> Self {
        Self {
            pool,
            pacer,
            cancel,
            stats: FetchStats::default(),
        }
    }

    #[must_use]
    pub const fn pool(&self) -> &ClientPool<A> {
        &self.pool
    }

    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub const fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Accounts `login` follows, as `follows` relations.
    pub async fn fetch_following(&self, login: &str) -> Vec<DiscoveredRelation> {
        let logins = self
            .collect_pages(&format!("following of {login}"), |api, page| api.following(login, page))
            .await
            .unwrap_or_default();

        relations(login, logins, RelationKind::Follows, None)
    }

    /// Accounts following `login`, as `follower` relations.
    pub async fn fetch_followers(&self, login: &str) -> Vec<DiscoveredRelation> {
        let logins = self
            .collect_pages(&format!("followers of {login}"), |api, page| api.followers(login, page))
            .await
            .unwrap_or_default();

        relations(login, logins, RelationKind::Follower, None)
    }

    /// Owners of the repositories `login` starred.
    ///
    /// These are `stargazer` relations in which the crawled account is the actor, so the
    /// resulting edge points from `login` to the owner. Each starred repository is a
    /// separate observation.
    pub async fn fetch_starred_owners(&self, login: &str) -> Vec<DiscoveredRelation> {
        let repos = self
            .collect_pages(&format!("stars of {login}"), |api, page| api.starred(login, page))
            .await
            .unwrap_or_default();

        repos
            .into_iter()
            .filter(|summary| !is_same_account(&summary.repo.owner, login))
            .map(|summary| {
                let repo = summary.repo.to_string();
                DiscoveredRelation::new(summary.repo.owner, RelationKind::Stargazer, Some(repo)).reversed()
            })
            .collect()
    }

    /// Up to `limit` non-fork repositories owned by `login`, most recently updated first.
    pub async fn fetch_owned_repos(&self, login: &str, limit: usize) -> Vec<RepoName> {
        let mut repos: Vec<RepoSummary> = self
            .collect_pages(&format!("repositories of {login}"), |api, page| api.owned_repos(login, page))
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|summary| !summary.fork)
            .collect();

        // stable sort keeps the API order for repositories without a timestamp
        repos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        repos.into_iter().take(limit).map(|summary| summary.repo).collect()
    }

    /// Accounts that starred `repo`, as `stargazer` relations toward its owner.
    pub async fn fetch_stargazers(&self, repo: &RepoName) -> Vec<DiscoveredRelation> {
        let logins = self
            .collect_pages(&format!("stargazers of {repo}"), |api, page| api.stargazers(repo, page))
            .await
            .unwrap_or_default();

        relations(&repo.owner, logins, RelationKind::Stargazer, Some(repo))
    }

    /// Accounts watching `repo`, as `watcher` relations toward its owner.
    pub async fn fetch_watchers(&self, repo: &RepoName) -> Vec<DiscoveredRelation> {
        let logins = self
            .collect_pages(&format!("watchers of {repo}"), |api, page| api.watchers(repo, page))
            .await
            .unwrap_or_default();

        relations(&repo.owner, logins, RelationKind::Watcher, Some(repo))
    }

    /// Distinct commit authors of `repo` other than its owner.
    pub async fn fetch_commit_authors(&self, repo: &RepoName) -> Vec<DiscoveredRelation> {
        let authors: BTreeSet<String> = self
            .collect_pages(&format!("commits of {repo}"), |api, page| api.commits(repo, page))
            .await
            .unwrap_or_default()
            .into_iter()
            .filter_map(|commit| commit.author_login)
            .collect();

        relations(&repo.owner, authors, RelationKind::CommitAuthor, Some(repo))
    }

    /// Distinct issue authors and assignees of `repo` other than its owner. Pull requests are skipped.
    pub async fn fetch_issue_participants(&self, repo: &RepoName) -> Vec<DiscoveredRelation> {
        let participants: BTreeSet<String> = self
            .collect_pages(&format!("issues of {repo}"), |api, page| api.issues(repo, page))
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|issue| !issue.is_pull_request)
            .flat_map(|issue| issue.author_login.into_iter().chain(issue.assignee_logins))
            .collect();

        relations(&repo.owner, participants, RelationKind::IssueParticipant, Some(repo))
    }

    /// Public profile of `login`, or `None` when it could not be fetched for any reason.
    pub async fn fetch_profile(&self, login: &str) -> Option<AccountProfile> {
        match self.call(|api| api.profile(login)).await? {
            ApiResponse::Success(profile, _) => {
                FetchStats::bump(&self.stats.profiles_fetched);
                Some(profile)
            }
            response => {
                self.log_unsuccessful(&format!("profile of {login}"), response);
                None
            }
        }
    }

    /// Public profile of `login`, failing with a descriptive error when it is unavailable.
    pub async fn resolve_profile(&self, login: &str) -> Result<AccountProfile> {
        let Some(response) = self.call(|api| api.profile(login)).await else {
            bail!("crawl cancelled before account '{login}' could be resolved");
        };

        match response {
            ApiResponse::Success(profile, _) => {
                FetchStats::bump(&self.stats.profiles_fetched);
                Ok(profile)
            }
            ApiResponse::NotFound(_) => bail!("GitHub account '{login}' does not exist"),
            ApiResponse::RateLimited(info) => {
                FetchStats::bump(&self.stats.rate_limited_calls);
                bail!(
                    "GitHub rate limit exhausted while resolving account '{login}', quota resets at {}",
                    info.reset_at.with_timezone(&chrono::Local).format("%T")
                )
            }
            ApiResponse::Failed(e, _) => {
                FetchStats::bump(&self.stats.failed_calls);
                Err(e.enrich_with(|| format!("could not fetch the profile of account '{login}'")))
            }
        }
    }

    /// Issue one paced call through the best client, returning `None` once the crawl is cancelled.
    async fn call<'a, T, F, Fut>(&'a self, op: F) -> Option<ApiResponse<T>>
    where
        F: FnOnce(&'a A) -> Fut,
        Fut: Future<Output = ApiResponse<T>>,
    {
        if self.cancel.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return None,
            () = self.pacer.wait() => {}
        }

        let client = self.pool.select();
        FetchStats::bump(&self.stats.api_calls);

        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return None,
            response = op(client.api()) => response,
        };

        self.pool.record(client, response.rate_limit());
        Some(response)
    }

    /// Request consecutive pages until the API reports no more, accumulating all items.
    ///
    /// Any unsuccessful page discards what was gathered so far.
    async fn collect_pages<'a, T, F, Fut>(&'a self, what: &str, op: F) -> Option<Vec<T>>
    where
        F: Fn(&'a A, u32) -> Fut,
        Fut: Future<Output = ApiResponse<Page<T>>>,
    {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            match self.call(|api| op(api, page)).await? {
                ApiResponse::Success(p, _) => {
                    items.extend(p.items);
                    if !p.has_next {
                        log::trace!(target: LOG_TARGET, "Fetched {} item(s) for {what} in {page} page(s)", items.len());
                        return Some(items);
                    }
                }
                response => {
                    self.log_unsuccessful(what, response);
                    return None;
                }
            }

            page += 1;
        }
    }

    fn log_unsuccessful<T>(&self, what: &str, response: ApiResponse<T>) {
        match response {
            ApiResponse::Success(..) => {}
            ApiResponse::NotFound(_) => {
                log::debug!(target: LOG_TARGET, "Nothing found for {what}");
            }
            ApiResponse::RateLimited(info) => {
                FetchStats::bump(&self.stats.rate_limited_calls);
                log::warn!(
                    target: LOG_TARGET,
                    "Rate limited while fetching {what}, quota resets at {}; skipping",
                    info.reset_at.with_timezone(&chrono::Local).format("%T")
                );
            }
            ApiResponse::Failed(e, _) => {
                FetchStats::bump(&self.stats.failed_calls);
                log::warn!(target: LOG_TARGET, "Could not fetch {what}: {e:#}");
            }
        }
    }
}

fn is_same_account(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Build relations of one kind, dropping the scope account itself.
fn relations(scope: &str, logins: impl IntoIterator<Item = String>, kind: RelationKind, repo: Option<&RepoName>) -> Vec<DiscoveredRelation> {
    logins
        .into_iter()
        .filter(|login| !is_same_account(login, scope))
        .map(|login| DiscoveredRelation::new(login, kind, repo.map(ToString::to_string)))
        .collect()
}
