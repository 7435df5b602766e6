//! GitHub REST client
//!
//! Thin client for the handful of listing endpoints the spider crawls. Listings are
//! fetched with `reqwest` one page at a time; the quota probe goes through `octocrab`.

use super::api::{ApiResponse, CommitSummary, GitHubApi, IssueSummary, Page, RateLimitInfo, RepoName, RepoSummary};
use super::AccountProfile;
use crate::Result;
use chrono::{DateTime, Utc};
use core::time::Duration;
use octocrab::Octocrab;
use ohno::IntoAppError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, LINK};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::sync::LazyLock;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "ghspider";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const PER_PAGE: u32 = 100;

/// Matches the `next` relation of a GitHub `Link` header
static NEXT_PAGE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r#"<[^>]+>;\s*rel="next""#).expect("invalid regex"));

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    owner: Account,
    #[serde(default)]
    fork: bool,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Commit {
    author: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    user: Option<Account>,
    #[serde(default)]
    assignees: Vec<Account>,
    pull_request: Option<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    login: String,
    name: Option<String>,
    #[serde(default)]
    avatar_url: String,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
    #[serde(default)]
    public_repos: u64,
    company: Option<String>,
    location: Option<String>,
    bio: Option<String>,
}

impl From<Repository> for RepoSummary {
    fn from(repo: Repository) -> Self {
        Self {
            repo: RepoName::new(repo.owner.login, repo.name),
            fork: repo.fork,
            updated_at: repo.updated_at,
        }
    }
}

impl From<Issue> for IssueSummary {
    fn from(issue: Issue) -> Self {
        Self {
            author_login: issue.user.map(|u| u.login),
            assignee_logins: issue.assignees.into_iter().map(|a| a.login).collect(),
            is_pull_request: issue.pull_request.is_some(),
        }
    }
}

impl From<Profile> for AccountProfile {
    fn from(p: Profile) -> Self {
        Self {
            login: p.login,
            name: p.name,
            avatar_url: p.avatar_url,
            followers: p.followers,
            following: p.following,
            public_repos: p.public_repos,
            company: p.company,
            location: p.location,
            bio: p.bio,
        }
    }
}

/// One credentialed (or anonymous) connection to the GitHub API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    octocrab: Octocrab,
    base_url: String,
}

impl GitHubClient {
    /// Create a client, authenticated when `token` is given.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(token: Option<&str>, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut client_builder = reqwest::Client::builder().user_agent(USER_AGENT).timeout(REQUEST_TIMEOUT);
        let mut octocrab_builder = Octocrab::builder()
            .base_uri(base_url.as_str())
            .into_app_err_with(|| format!("invalid API URL '{base_url}'"))?;

        if let Some(t) = token {
            let mut auth_val = HeaderValue::from_str(&format!("token {t}"))?;
            auth_val.set_sensitive(true);

            let mut headers = HeaderMap::new();
            let _ = headers.insert(AUTHORIZATION, auth_val);

            client_builder = client_builder.default_headers(headers);
            octocrab_builder = octocrab_builder.personal_token(t);
        }

        Ok(Self {
            client: client_builder.build()?,
            octocrab: octocrab_builder.build()?,
            base_url,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn page_url(&self, path: &str, page: u32, query: &str) -> String {
        let sep = if query.is_empty() { "" } else { "&" };
        format!("{}/{path}?{query}{sep}per_page={PER_PAGE}&page={page}", self.base_url)
    }

    /// GET `url`, classify the outcome and decode the body on success.
    async fn get<T: DeserializeOwned>(&self, url: &str) -> ApiResponse<(T, bool)> {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ApiResponse::Failed(e.into(), None),
        };

        let rate_limit = extract_rate_limit_from_headers(resp.headers());
        let has_next = has_next_page(resp.headers());

        let status = resp.status();
        if status.is_success() {
            return match resp.json::<T>().await.into_app_err_with(|| format!("unable to decode response from {url}")) {
                Ok(body) => ApiResponse::Success((body, has_next), rate_limit),
                Err(e) => ApiResponse::Failed(e, rate_limit),
            };
        }

        // a 403 with quota left is a permission problem, not throttling
        let throttled = match status.as_u16() {
            429 => true,
            403 => rate_limit.is_none_or(|info| info.remaining == 0),
            _ => false,
        };

        if throttled {
            let rate_limit = rate_limit.unwrap_or_else(|| RateLimitInfo {
                remaining: 0,
                reset_at: Utc::now() + chrono::Duration::hours(1),
            });
            return ApiResponse::RateLimited(rate_limit);
        }

        if status.as_u16() == 404 {
            return ApiResponse::NotFound(rate_limit);
        }

        let error = resp.error_for_status().expect_err("status is not successful at this point");
        ApiResponse::Failed(error.into(), rate_limit)
    }

    async fn get_page<T: DeserializeOwned, U>(&self, url: &str, convert: impl Fn(T) -> U + Send) -> ApiResponse<Page<U>> {
        self.get::<Vec<T>>(url).await.map(|(items, has_next)| Page {
            items: items.into_iter().map(convert).collect(),
            has_next,
        })
    }

    async fn get_logins(&self, url: &str) -> ApiResponse<Page<String>> {
        self.get_page(url, |a: Account| a.login).await
    }
}

impl GitHubApi for GitHubClient {
    async fn following(&self, login: &str, page: u32) -> ApiResponse<Page<String>> {
        self.get_logins(&self.page_url(&format!("users/{login}/following"), page, "")).await
    }

    async fn followers(&self, login: &str, page: u32) -> ApiResponse<Page<String>> {
        self.get_logins(&self.page_url(&format!("users/{login}/followers"), page, "")).await
    }

    async fn starred(&self, login: &str, page: u32) -> ApiResponse<Page<RepoSummary>> {
        let url = self.page_url(&format!("users/{login}/starred"), page, "");
        self.get_page::<Repository, _>(&url, RepoSummary::from).await
    }

    async fn owned_repos(&self, login: &str, page: u32) -> ApiResponse<Page<RepoSummary>> {
        let url = self.page_url(&format!("users/{login}/repos"), page, "type=owner&sort=updated&direction=desc");
        self.get_page::<Repository, _>(&url, RepoSummary::from).await
    }

    async fn stargazers(&self, repo: &RepoName, page: u32) -> ApiResponse<Page<String>> {
        self.get_logins(&self.page_url(&format!("repos/{repo}/stargazers"), page, "")).await
    }

    async fn watchers(&self, repo: &RepoName, page: u32) -> ApiResponse<Page<String>> {
        self.get_logins(&self.page_url(&format!("repos/{repo}/subscribers"), page, "")).await
    }

    async fn commits(&self, repo: &RepoName, page: u32) -> ApiResponse<Page<CommitSummary>> {
        let url = self.page_url(&format!("repos/{repo}/commits"), page, "");
        self.get_page(&url, |c: Commit| CommitSummary {
            author_login: c.author.map(|a| a.login),
        })
        .await
    }

    async fn issues(&self, repo: &RepoName, page: u32) -> ApiResponse<Page<IssueSummary>> {
        let url = self.page_url(&format!("repos/{repo}/issues"), page, "state=all");
        self.get_page::<Issue, _>(&url, IssueSummary::from).await
    }

    async fn profile(&self, login: &str) -> ApiResponse<AccountProfile> {
        let url = format!("{}/users/{login}", self.base_url);
        self.get::<Profile>(&url).await.map(|(profile, _)| profile.into())
    }

    async fn rate_limit(&self) -> ApiResponse<RateLimitInfo> {
        match self.octocrab.ratelimit().get().await {
            Ok(limits) => {
                let reset_at = i64::try_from(limits.rate.reset)
                    .ok()
                    .and_then(|ts| DateTime::from_timestamp(ts, 0))
                    .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

                let info = RateLimitInfo {
                    remaining: limits.rate.remaining,
                    reset_at,
                };
                ApiResponse::Success(info, Some(info))
            }
            Err(e) => ApiResponse::Failed(e.into(), None),
        }
    }
}

/// Extract rate limit information from API response headers
fn extract_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?.parse::<usize>().ok()?;
    let reset_timestamp = headers.get("x-ratelimit-reset")?.to_str().ok()?.parse::<i64>().ok()?;
    let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

    Some(RateLimitInfo { remaining, reset_at })
}

fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get(LINK)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|link| NEXT_PAGE_REGEX.is_match(link))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_rate_limit_from_headers() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        let _ = headers.insert("x-ratelimit-reset", HeaderValue::from_static("1704067200"));

        let rate_limit = extract_rate_limit_from_headers(&headers).unwrap();

        assert_eq!(rate_limit.remaining, 4999);
        assert_eq!(rate_limit.reset_at.timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_extract_rate_limit_missing_headers() {
        assert!(extract_rate_limit_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_extract_rate_limit_invalid_remaining() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ratelimit-remaining", HeaderValue::from_static("lots"));
        let _ = headers.insert("x-ratelimit-reset", HeaderValue::from_static("1704067200"));

        assert!(extract_rate_limit_from_headers(&headers).is_none());
    }

    #[test]
    fn test_next_page_detection() {
        let mut headers = HeaderMap::new();
        assert!(!has_next_page(&headers));

        let _ = headers.insert(
            LINK,
            HeaderValue::from_static(
                r#"<https://api.github.com/user/1/followers?page=2>; rel="next", <https://api.github.com/user/1/followers?page=9>; rel="last""#,
            ),
        );
        assert!(has_next_page(&headers));

        let _ = headers.insert(
            LINK,
            HeaderValue::from_static(
                r#"<https://api.github.com/user/1/followers?page=1>; rel="first", <https://api.github.com/user/1/followers?page=8>; rel="prev""#,
            ),
        );
        assert!(!has_next_page(&headers));
    }

    #[test]
    fn test_issue_deserialize_with_pull_request() {
        let json = r#"{
            "user": { "login": "bob" },
            "assignees": [{ "login": "carol" }, { "login": "dave" }],
            "pull_request": { "url": "https://api.github.com/repos/alice/tool/pulls/1" }
        }"#;

        let issue: IssueSummary = serde_json::from_str::<Issue>(json).unwrap().into();
        assert_eq!(issue.author_login.as_deref(), Some("bob"));
        assert_eq!(issue.assignee_logins, ["carol", "dave"]);
        assert!(issue.is_pull_request);
    }

    #[test]
    fn test_issue_deserialize_minimal() {
        let issue: IssueSummary = serde_json::from_str::<Issue>(r#"{ "user": null }"#).unwrap().into();
        assert!(issue.author_login.is_none());
        assert!(issue.assignee_logins.is_empty());
        assert!(!issue.is_pull_request);
    }

    #[test]
    fn test_repository_deserialize() {
        let json = r#"{
            "name": "tool",
            "owner": { "login": "alice", "id": 1 },
            "fork": true,
            "updated_at": "2024-01-01T00:00:00Z",
            "stargazers_count": 12
        }"#;

        let repo: RepoSummary = serde_json::from_str::<Repository>(json).unwrap().into();
        assert_eq!(repo.repo.to_string(), "alice/tool");
        assert!(repo.fork);
        assert_eq!(repo.updated_at.unwrap().timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_profile_deserialize_with_nulls() {
        let json = r#"{
            "login": "octocat",
            "name": null,
            "avatar_url": "https://avatars.githubusercontent.com/u/583231",
            "followers": 20,
            "following": 9,
            "public_repos": 8,
            "company": "@github",
            "location": null,
            "bio": null
        }"#;

        let profile: AccountProfile = serde_json::from_str::<Profile>(json).unwrap().into();
        assert_eq!(profile.login, "octocat");
        assert_eq!(profile.followers, 20);
        assert_eq!(profile.public_repos, 8);
        assert_eq!(profile.company.as_deref(), Some("@github"));
        assert!(profile.name.is_none());
    }

    #[tokio::test]
    async fn test_client_trims_base_url() {
        let client = GitHubClient::new(Some("test_token"), "https://github.example.com/api/v3/").unwrap();
        assert_eq!(client.base_url(), "https://github.example.com/api/v3");
        assert_eq!(
            client.page_url("users/alice/repos", 2, "type=owner"),
            "https://github.example.com/api/v3/users/alice/repos?type=owner&per_page=100&page=2"
        );
    }
}
