//! In-memory [`GitHubApi`] used by the unit tests.

use super::AccountProfile;
use super::api::{ApiResponse, CommitSummary, GitHubApi, IssueSummary, Page, RateLimitInfo, RepoName, RepoSummary};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use core::sync::atomic::{AtomicUsize, Ordering};
use core::time::Duration;
use std::collections::{HashMap, HashSet};

fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_067_200, 0).unwrap()
}

#[derive(Debug)]
pub struct FakeGitHub {
    profiles: HashMap<String, AccountProfile>,
    following: HashMap<String, Vec<String>>,
    followers: HashMap<String, Vec<String>>,
    starred: HashMap<String, Vec<RepoSummary>>,
    repos: HashMap<String, Vec<RepoSummary>>,
    stargazers: HashMap<RepoName, Vec<String>>,
    watchers: HashMap<RepoName, Vec<String>>,
    commits: HashMap<RepoName, Vec<CommitSummary>>,
    issues: HashMap<RepoName, Vec<IssueSummary>>,
    failing: HashSet<String>,
    rate_limited: HashSet<String>,
    rate_limit: RateLimitInfo,
    page_size: usize,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl Default for FakeGitHub {
    fn default() -> Self {
        Self {
            profiles: HashMap::new(),
            following: HashMap::new(),
            followers: HashMap::new(),
            starred: HashMap::new(),
            repos: HashMap::new(),
            stargazers: HashMap::new(),
            watchers: HashMap::new(),
            commits: HashMap::new(),
            issues: HashMap::new(),
            failing: HashSet::new(),
            rate_limited: HashSet::new(),
            rate_limit: RateLimitInfo {
                remaining: 5000,
                reset_at: epoch() + ChronoDuration::hours(1),
            },
            page_size: 100,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeGitHub {
    pub fn with_profile(mut self, login: &str, followers: u64, public_repos: u64) -> Self {
        let _ = self.profiles.insert(
            login.to_string(),
            AccountProfile {
                login: login.to_string(),
                avatar_url: format!("https://avatars.example.com/{login}"),
                followers,
                public_repos,
                ..AccountProfile::default()
            },
        );
        self
    }

    pub fn with_following(mut self, login: &str, followed: &str) -> Self {
        self.following.entry(login.to_string()).or_default().push(followed.to_string());
        self
    }

    pub fn with_follower(mut self, login: &str, follower: &str) -> Self {
        self.followers.entry(login.to_string()).or_default().push(follower.to_string());
        self
    }

    pub fn with_starred(mut self, login: &str, owner: &str, name: &str) -> Self {
        self.starred.entry(login.to_string()).or_default().push(RepoSummary {
            repo: RepoName::new(owner, name),
            fork: false,
            updated_at: None,
        });
        self
    }

    /// Add a repository owned by `owner`, last updated `minutes` after a fixed epoch.
    pub fn with_repo(mut self, owner: &str, name: &str, fork: bool, minutes: i64) -> Self {
        self.repos.entry(owner.to_string()).or_default().push(RepoSummary {
            repo: RepoName::new(owner, name),
            fork,
            updated_at: Some(epoch() + ChronoDuration::minutes(minutes)),
        });
        self
    }

    pub fn with_stargazer(mut self, repo: &RepoName, login: &str) -> Self {
        self.stargazers.entry(repo.clone()).or_default().push(login.to_string());
        self
    }

    pub fn with_watcher(mut self, repo: &RepoName, login: &str) -> Self {
        self.watchers.entry(repo.clone()).or_default().push(login.to_string());
        self
    }

    pub fn with_commit(mut self, repo: &RepoName, author: Option<&str>) -> Self {
        self.commits.entry(repo.clone()).or_default().push(CommitSummary {
            author_login: author.map(ToString::to_string),
        });
        self
    }

    pub fn with_issue(mut self, repo: &RepoName, author: Option<&str>, assignees: &[&str], is_pull_request: bool) -> Self {
        self.issues.entry(repo.clone()).or_default().push(IssueSummary {
            author_login: author.map(ToString::to_string),
            assignee_logins: assignees.iter().map(ToString::to_string).collect(),
            is_pull_request,
        });
        self
    }

    /// Every call scoped to `login` (or one of its repositories) fails.
    pub fn failing(mut self, login: &str) -> Self {
        let _ = self.failing.insert(login.to_string());
        self
    }

    /// Every call scoped to `login` (or one of its repositories) is rate limited.
    pub fn rate_limited(mut self, login: &str) -> Self {
        let _ = self.rate_limited.insert(login.to_string());
        self
    }

    pub const fn with_rate_limit(mut self, remaining: usize, reset_at: DateTime<Utc>) -> Self {
        self.rate_limit = RateLimitInfo { remaining, reset_at };
        self
    }

    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond<T: Clone>(&self, scope: &str, items: Option<&Vec<T>>, page: u32) -> ApiResponse<Page<T>> {
        self.respond_with(scope, || {
            let items = items.map(Vec::as_slice).unwrap_or_default();
            let start = (page as usize - 1) * self.page_size;
            let end = (start + self.page_size).min(items.len());
            Page {
                items: items.get(start..end).unwrap_or_default().to_vec(),
                has_next: end < items.len(),
            }
        })
        .await
    }

    async fn respond_with<T>(&self, scope: &str, make: impl FnOnce() -> T) -> ApiResponse<T> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(scope) {
            return ApiResponse::Failed(ohno::app_err!("simulated failure for {scope}"), Some(self.rate_limit));
        }

        if self.rate_limited.contains(scope) {
            return ApiResponse::RateLimited(RateLimitInfo {
                remaining: 0,
                reset_at: self.rate_limit.reset_at,
            });
        }

        ApiResponse::Success(make(), Some(self.rate_limit))
    }
}

impl GitHubApi for FakeGitHub {
    async fn following(&self, login: &str, page: u32) -> ApiResponse<Page<String>> {
        self.respond(login, self.following.get(login), page).await
    }

    async fn followers(&self, login: &str, page: u32) -> ApiResponse<Page<String>> {
        self.respond(login, self.followers.get(login), page).await
    }

    async fn starred(&self, login: &str, page: u32) -> ApiResponse<Page<RepoSummary>> {
        self.respond(login, self.starred.get(login), page).await
    }

    async fn owned_repos(&self, login: &str, page: u32) -> ApiResponse<Page<RepoSummary>> {
        self.respond(login, self.repos.get(login), page).await
    }

    async fn stargazers(&self, repo: &RepoName, page: u32) -> ApiResponse<Page<String>> {
        self.respond(&repo.owner, self.stargazers.get(repo), page).await
    }

    async fn watchers(&self, repo: &RepoName, page: u32) -> ApiResponse<Page<String>> {
        self.respond(&repo.owner, self.watchers.get(repo), page).await
    }

    async fn commits(&self, repo: &RepoName, page: u32) -> ApiResponse<Page<CommitSummary>> {
        self.respond(&repo.owner, self.commits.get(repo), page).await
    }

    async fn issues(&self, repo: &RepoName, page: u32) -> ApiResponse<Page<IssueSummary>> {
        self.respond(&repo.owner, self.issues.get(repo), page).await
    }

    async fn profile(&self, login: &str) -> ApiResponse<AccountProfile> {
        let Some(profile) = self.profiles.get(login) else {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            return ApiResponse::NotFound(Some(self.rate_limit));
        };

        self.respond_with(login, || profile.clone()).await
    }

    async fn rate_limit(&self) -> ApiResponse<RateLimitInfo> {
        ApiResponse::Success(self.rate_limit, Some(self.rate_limit))
    }
}
