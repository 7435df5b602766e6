//! Depth-synchronized crawl of the social graph around a seed account.
//!
//! Each level fans out over its frontier in two phases separated by a barrier:
//! relation enumeration (edges go into the store as soon as they are found) and
//! profile fetching for the accounts discovered along the way. Only the accounts
//! admitted during the profile phase make up the next frontier.

use super::api::{GitHubApi, RepoName};
use super::fetcher::{FetchSummary, RelationFetcher};
use super::progress::Progress;
use super::throttler::Throttler;
use super::{AccountNode, CrawlFilters, DiscoveredRelation, GraphStore, GraphView};
use crate::Result;
use core::fmt::{Display, Formatter};
use core::sync::atomic::{AtomicUsize, Ordering};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

const LOG_TARGET: &str = "    spider";

/// Deepest level a crawl may reach
pub const MAX_DEPTH: usize = 5;

pub const DEFAULT_DEPTH: i64 = 1;
pub const DEFAULT_MAX_NODES: i64 = 500;
pub const DEFAULT_WORKERS: i64 = 5;
pub const DEFAULT_REPOS_PER_ACCOUNT: i64 = 10;

/// Crawl parameters as supplied by the user.
///
/// Values are kept raw; the accessors apply the defaults and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    pub depth: i64,
    pub max_nodes: i64,
    pub min_followers: u64,
    pub min_repos: u64,
    pub workers: i64,
    pub repos_per_account: i64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
            min_followers: 0,
            min_repos: 0,
            workers: DEFAULT_WORKERS,
            repos_per_account: DEFAULT_REPOS_PER_ACCOUNT,
        }
    }
}

/// Non-positive values select the default.
fn positive_or(value: i64, default: i64) -> usize {
    let value = if value > 0 { value } else { default };
    usize::try_from(value).unwrap_or(usize::MAX)
}

impl CrawlSettings {
    /// Number of levels to expand, between 1 and [`MAX_DEPTH`].
    #[must_use]
    pub fn depth(&self) -> usize {
        positive_or(self.depth, DEFAULT_DEPTH).min(MAX_DEPTH)
    }

    #[must_use]
    pub fn max_nodes(&self) -> usize {
        positive_or(self.max_nodes, DEFAULT_MAX_NODES)
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        positive_or(self.workers, DEFAULT_WORKERS)
    }

    #[must_use]
    pub fn repos_per_account(&self) -> usize {
        positive_or(self.repos_per_account, DEFAULT_REPOS_PER_ACCOUNT)
    }

    #[must_use]
    pub fn filters(&self) -> CrawlFilters {
        CrawlFilters::new(self.min_followers, self.min_repos, self.max_nodes())
    }
}

/// Where a crawl currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Seeding,
    ExpandingLevel(usize),
    Serializing,
    Done,
}

impl Display for CrawlState {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Seeding => write!(f, "seeding"),
            Self::ExpandingLevel(depth) => write!(f, "expanding level {depth}"),
            Self::Serializing => write!(f, "serializing"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Outcome of a finished crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    pub levels_completed: usize,
    pub cancelled: bool,
    pub budget_reached: bool,
    pub nodes: usize,
    pub edges: usize,
    pub stats: FetchSummary,
}

/// Breadth-first crawler that fills a [`GraphStore`].
///
/// The node budget is checked right before each insertion with no reservation across
/// workers. Workers admitting accounts concurrently near the boundary may all pass the
/// check, so the final node count can exceed the maximum by up to the worker limit.
#[derive(Debug)]
pub struct Spider<A> {
    fetcher: RelationFetcher<A>,
    settings: CrawlSettings,
    filters: CrawlFilters,
    store: Arc<GraphStore>,
    level: Arc<AtomicUsize>,
    state: Mutex<CrawlState>,
}

impl<A: GitHubApi> Spider<A> {
    #[must_use]
    pub fn new(fetcher: RelationFetcher<A>, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            settings,
            filters: settings.filters(),
            store: Arc::new(GraphStore::new()),
            level: Arc::new(AtomicUsize::new(0)),
            state: Mutex::new(CrawlState::Idle),
        }
    }

    #[must_use]
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    #[must_use]
    pub const fn fetcher(&self) -> &RelationFetcher<A> {
        &self.fetcher
    }

    #[must_use]
    pub fn state(&self) -> CrawlState {
        *self.state.lock().expect("lock poisoned")
    }

    fn enter(&self, state: CrawlState) {
        let mut current = self.state.lock().expect("lock poisoned");
        log::info!(target: LOG_TARGET, "Crawl state: {} -> {state}", *current);
        *current = state;
    }

    /// Crawl the graph around `seed`.
    ///
    /// Fails only when the seed account cannot be resolved. Cancellation ends the crawl
    /// early but still reports success, with whatever was gathered so far.
    pub async fn run(&self, seed: &str, progress: Option<&dyn Progress>) -> Result<CrawlReport> {
        self.enter(CrawlState::Seeding);

        let profile = self.fetcher.resolve_profile(seed).await?;
        let seed_login = profile.login.clone();
        let _ = self.store.add_node(AccountNode::new(profile, 0));

        if let Some(progress) = progress {
            progress.set_phase("Crawling");
            let store = Arc::clone(&self.store);
            let level = Arc::clone(&self.level);
            let max_depth = self.settings.depth();
            progress.set_indeterminate(Box::new(move || {
                format!(
                    "level {}/{max_depth}, {} accounts, {} relationships",
                    level.load(Ordering::Relaxed),
                    store.node_count(),
                    store.edge_count()
                )
            }));
        }

        let mut frontier = vec![seed_login.clone()];
        let mut levels_completed = 0;

        for depth in 1..=self.settings.depth() {
            if self.fetcher.cancel_token().is_cancelled() {
                log::info!(target: LOG_TARGET, "Crawl cancelled, stopping before level {depth}");
                break;
            }

            if frontier.is_empty() {
                log::info!(target: LOG_TARGET, "Nothing left to expand at level {depth}");
                break;
            }

            if self.filters.budget_reached(self.store.node_count()) {
                log::info!(target: LOG_TARGET, "Node budget of {} reached before level {depth}", self.filters.max_nodes);
                break;
            }

            self.enter(CrawlState::ExpandingLevel(depth));
            self.level.store(depth, Ordering::Relaxed);

            frontier = self.expand_level(&frontier, depth).await;
            if !self.fetcher.cancel_token().is_cancelled() {
                levels_completed = depth;
            }

            log::info!(
                target: LOG_TARGET,
                "Level {depth} done: {} new account(s), {} account(s) and {} relationship(s) so far",
                frontier.len(),
                self.store.node_count(),
                self.store.edge_count()
            );
        }

        if let Some(progress) = progress {
            progress.done();
        }

        self.enter(CrawlState::Serializing);

        Ok(CrawlReport {
            seed: seed_login,
            levels_completed,
            cancelled: self.fetcher.cancel_token().is_cancelled(),
            budget_reached: self.filters.budget_reached(self.store.node_count()),
            nodes: self.store.node_count(),
            edges: self.store.edge_count(),
            stats: self.fetcher.stats().summary(),
        })
    }

    /// Hand the finished graph to `export` under a single read lock, then mark the crawl done.
    pub fn export<T>(&self, export: impl FnOnce(&GraphView<'_>) -> Result<T>) -> Result<T> {
        let result = {
            let view = self.store.view();
            export(&view)
        };

        self.enter(CrawlState::Done);
        result
    }

    /// Expand one level and return the accounts admitted during it, sorted by login.
    async fn expand_level(&self, frontier: &[String], depth: usize) -> Vec<String> {
        let cancel = self.fetcher.cancel_token();
        let workers = self.settings.workers();

        let pending = Mutex::new(BTreeSet::new());
        let account_throttler = Throttler::new(workers, cancel.clone());
        let repo_throttler = Throttler::new(workers, cancel.clone());

        {
            let (pending, account_throttler, repo_throttler) = (&pending, &account_throttler, &repo_throttler);
            let _ = join_all(frontier.iter().map(|login| async move {
                let Some(_permit) = account_throttler.acquire().await else {
                    return;
                };
                self.enumerate_account(login, repo_throttler, pending).await;
            }))
            .await;
        }

        let candidates = pending.into_inner().expect("lock poisoned");
        log::debug!(target: LOG_TARGET, "Level {depth}: {} candidate account(s) to profile", candidates.len());

        let admitted = Mutex::new(Vec::new());
        let profile_throttler = Throttler::new(workers, cancel.clone());

        {
            let (admitted, profile_throttler) = (&admitted, &profile_throttler);
            let _ = join_all(candidates.iter().map(|login| async move {
                let Some(_permit) = profile_throttler.acquire().await else {
                    return;
                };

                if let Some(login) = self.admit(login, depth).await {
                    admitted.lock().expect("lock poisoned").push(login);
                }
            }))
            .await;
        }

        let mut next = admitted.into_inner().expect("lock poisoned");
        next.sort();
        next
    }

    /// Run every relation listing for one account concurrently, recording results as they arrive.
    async fn enumerate_account(&self, login: &str, repo_throttler: &Throttler, pending: &Mutex<BTreeSet<String>>) {
        log::debug!(target: LOG_TARGET, "Enumerating relations of {login}");

        let following = async { self.record(login, self.fetcher.fetch_following(login).await, pending) };
        let followers = async { self.record(login, self.fetcher.fetch_followers(login).await, pending) };
        let starred = async { self.record(login, self.fetcher.fetch_starred_owners(login).await, pending) };
        let repos = async {
            let repos = self.fetcher.fetch_owned_repos(login, self.settings.repos_per_account()).await;
            let _ = join_all(repos.iter().map(|repo| async move {
                let Some(_permit) = repo_throttler.acquire().await else {
                    return;
                };
                self.enumerate_repo(login, repo, pending).await;
            }))
            .await;
        };

        let ((), (), (), ()) = tokio::join!(following, followers, starred, repos);
    }

    async fn enumerate_repo(&self, login: &str, repo: &RepoName, pending: &Mutex<BTreeSet<String>>) {
        let stargazers = async { self.record(login, self.fetcher.fetch_stargazers(repo).await, pending) };
        let watchers = async { self.record(login, self.fetcher.fetch_watchers(repo).await, pending) };
        let commits = async { self.record(login, self.fetcher.fetch_commit_authors(repo).await, pending) };
        let issues = async { self.record(login, self.fetcher.fetch_issue_participants(repo).await, pending) };

        let ((), (), (), ()) = tokio::join!(stargazers, watchers, commits, issues);
    }

    /// Turn relations found while crawling `login` into edges and queue unknown accounts.
    fn record(&self, login: &str, relations: Vec<DiscoveredRelation>, pending: &Mutex<BTreeSet<String>>) {
        if relations.is_empty() {
            return;
        }

        let mut discovered = Vec::new();
        for relation in &relations {
            let (source, target) = relation.endpoints(login);
            self.store.add_edge(source, target, relation.kind, relation.repo.as_deref());

            if !self.store.has_node(&relation.login) {
                discovered.push(relation.login.clone());
            }
        }

        pending.lock().expect("lock poisoned").extend(discovered);
    }

    /// Fetch the profile of `login` and admit it as a node at `depth` if the filters allow.
    async fn admit(&self, login: &str, depth: usize) -> Option<String> {
        if self.filters.budget_reached(self.store.node_count()) {
            return None;
        }

        let profile = self.fetcher.fetch_profile(login).await?;
        if !self.filters.admits_profile(profile.followers, profile.public_repos) {
            log::debug!(
                target: LOG_TARGET,
                "Skipping {login}: {} follower(s), {} public repo(s)",
                profile.followers,
                profile.public_repos
            );
            return None;
        }

        if self.filters.budget_reached(self.store.node_count()) {
            return None;
        }

        let login = profile.login.clone();
        self.store.add_node(AccountNode::new(profile, depth)).then_some(login)
    }
}
