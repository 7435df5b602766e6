//! Social-graph spider
//!
//! Crawls GitHub breadth-first from a seed account and records who follows, stars,
//! watches, commits to and files issues against whom.
//!
//! # Implementation Model
//!
//! - [`GitHubApi`] is the page-level view of the REST API; [`GitHubClient`] implements it over HTTP.
//! - [`ClientPool`] holds one client per credential and picks the one with the most quota left.
//! - [`RelationFetcher`] paginates listings through the pool behind the shared [`Pacer`] and
//!   turns them into [`DiscoveredRelation`]s, absorbing every fetch failure.
//! - [`GraphStore`] aggregates edges and admits nodes under a single read/write lock.
//! - [`CrawlFilters`] decide which discovered accounts become nodes.
//! - [`Spider`] drives the crawl level by level, with [`Throttler`]s bounding the fan-out.
//! - [`gexf`] renders the finished graph.

mod account;
mod api;
mod client_pool;
mod engine;
mod fetcher;
mod filters;
pub mod gexf;
mod github;
mod graph_store;
mod pacer;
mod progress;
mod relation;
mod throttler;

#[cfg(test)]
mod fake;

pub use account::{AccountNode, AccountProfile};
pub use api::{ApiResponse, CommitSummary, GitHubApi, IssueSummary, Page, RateLimitInfo, RepoName, RepoSummary};
pub use client_pool::{
    ClientPool, DEFAULT_LOW_QUOTA_THRESHOLD, GITHUB_RATE_LIMIT_AUTHENTICATED, GITHUB_RATE_LIMIT_UNAUTHENTICATED, ManagedClient,
};
pub use engine::{CrawlReport, CrawlSettings, CrawlState, MAX_DEPTH, Spider};
pub use fetcher::{FetchStats, FetchSummary, RelationFetcher};
pub use filters::CrawlFilters;
pub use github::{DEFAULT_API_URL, GitHubClient};
pub use graph_store::{EdgeKey, GraphStore, GraphView, RelationshipEdge};
pub use pacer::Pacer;
pub use progress::Progress;
pub use relation::{DiscoveredRelation, EdgeDirection, RelationKind};
pub use throttler::Throttler;
