//! The slice of the GitHub REST API the spider depends on.
//!
//! Every operation is page-level: the caller asks for one page and learns whether
//! another one follows. Pagination, client selection and pacing are the job of the
//! [`RelationFetcher`](super::RelationFetcher), so implementations stay dumb.

use super::AccountProfile;
use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};

/// Rate limit information reported alongside an API response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

/// Outcome of a single API call
#[derive(Debug)]
pub enum ApiResponse<T> {
    /// Request succeeded - contains data and optional rate limit info
    Success(T, Option<RateLimitInfo>),

    /// The credential used for the call is out of quota until the reset time
    RateLimited(RateLimitInfo),

    /// The requested account or repository does not exist (404)
    NotFound(Option<RateLimitInfo>),

    /// Request failed for any other reason
    Failed(ohno::AppError, Option<RateLimitInfo>),
}

impl<T> ApiResponse<T> {
    /// Rate limit info carried by the response, whatever its outcome.
    #[must_use]
    pub const fn rate_limit(&self) -> Option<RateLimitInfo> {
        match self {
            Self::Success(_, rl) | Self::NotFound(rl) | Self::Failed(_, rl) => *rl,
            Self::RateLimited(rl) => Some(*rl),
        }
    }

    /// Transform the payload of a successful response, keeping every other outcome as is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            Self::Success(value, rl) => ApiResponse::Success(f(value), rl),
            Self::RateLimited(rl) => ApiResponse::RateLimited(rl),
            Self::NotFound(rl) => ApiResponse::NotFound(rl),
            Self::Failed(e, rl) => ApiResponse::Failed(e, rl),
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self { items, has_next: false }
    }
}

/// `owner/name` pair identifying a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoName {
    pub owner: String,
    pub name: String,
}

impl RepoName {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl Display for RepoName {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository entry from an account's owned or starred listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSummary {
    pub repo: RepoName,
    pub fork: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Commit entry; the author is absent when the commit email maps to no account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub author_login: Option<String>,
}

/// Issue entry, which GitHub also uses for pull requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
    pub author_login: Option<String>,
    pub assignee_logins: Vec<String>,
    pub is_pull_request: bool,
}

/// Page-level access to the GitHub endpoints the spider crawls.
pub trait GitHubApi: Send + Sync {
    /// Accounts `login` follows
    fn following(&self, login: &str, page: u32) -> impl Future<Output = ApiResponse<Page<String>>> + Send;

    /// Accounts following `login`
    fn followers(&self, login: &str, page: u32) -> impl Future<Output = ApiResponse<Page<String>>> + Send;

    /// Repositories `login` has starred
    fn starred(&self, login: &str, page: u32) -> impl Future<Output = ApiResponse<Page<RepoSummary>>> + Send;

    /// Repositories owned by `login`, most recently updated first
    fn owned_repos(&self, login: &str, page: u32) -> impl Future<Output = ApiResponse<Page<RepoSummary>>> + Send;

    /// Accounts that starred `repo`
    fn stargazers(&self, repo: &RepoName, page: u32) -> impl Future<Output = ApiResponse<Page<String>>> + Send;

    /// Accounts watching `repo`
    fn watchers(&self, repo: &RepoName, page: u32) -> impl Future<Output = ApiResponse<Page<String>>> + Send;

    /// Commits on the default branch of `repo`
    fn commits(&self, repo: &RepoName, page: u32) -> impl Future<Output = ApiResponse<Page<CommitSummary>>> + Send;

    /// Issues and pull requests of `repo`, in any state
    fn issues(&self, repo: &RepoName, page: u32) -> impl Future<Output = ApiResponse<Page<IssueSummary>>> + Send;

    /// Public profile of `login`
    fn profile(&self, login: &str) -> impl Future<Output = ApiResponse<AccountProfile>> + Send;

    /// Current quota of the credential behind this client
    fn rate_limit(&self) -> impl Future<Output = ApiResponse<RateLimitInfo>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_name_display() {
        assert_eq!(RepoName::new("rust-lang", "rust").to_string(), "rust-lang/rust");
    }

    #[test]
    fn test_rate_limit_of_each_outcome() {
        let info = RateLimitInfo {
            remaining: 42,
            reset_at: DateTime::from_timestamp(1_704_067_200, 0).unwrap(),
        };

        assert_eq!(ApiResponse::Success((), Some(info)).rate_limit(), Some(info));
        assert_eq!(ApiResponse::<()>::RateLimited(info).rate_limit(), Some(info));
        assert_eq!(ApiResponse::<()>::NotFound(None).rate_limit(), None);
        assert_eq!(ApiResponse::<()>::Failed(ohno::app_err!("boom"), Some(info)).rate_limit(), Some(info));
    }

    #[test]
    fn test_map_only_touches_success() {
        match ApiResponse::Success(2, None).map(|n| n * 21) {
            ApiResponse::Success(n, None) => assert_eq!(n, 42),
            other => panic!("unexpected response: {other:?}"),
        }

        assert!(matches!(ApiResponse::<i32>::NotFound(None).map(|n| n + 1), ApiResponse::NotFound(None)));
    }
}
