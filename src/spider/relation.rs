use serde::Serialize;
use strum::{Display, EnumIter, IntoStaticStr};

/// The fixed vocabulary of relationships the spider records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, IntoStaticStr, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    /// The crawled account follows the discovered one
    Follows,
    /// The discovered account follows the crawled one
    Follower,
    /// Starred a repository owned by the other account
    Stargazer,
    /// Watches a repository owned by the crawled account
    Watcher,
    /// Authored commits in a repository owned by the crawled account
    CommitAuthor,
    /// Opened or is assigned to an issue in a repository owned by the crawled account
    IssueParticipant,
}

/// Which endpoint of a discovered relation the edge starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    FromDiscovered,
    FromCrawled,
}

impl EdgeDirection {
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::FromDiscovered => Self::FromCrawled,
            Self::FromCrawled => Self::FromDiscovered,
        }
    }
}

impl RelationKind {
    /// Conventional edge direction for a relation discovered while crawling an account.
    ///
    /// Followers, stargazers and watchers act on the crawled account, so their edges
    /// start at the discovered account. The other kinds start at the crawled account.
    #[must_use]
    pub const fn direction(self) -> EdgeDirection {
        match self {
            Self::Follower | Self::Stargazer | Self::Watcher => EdgeDirection::FromDiscovered,
            Self::Follows | Self::CommitAuthor | Self::IssueParticipant => EdgeDirection::FromCrawled,
        }
    }

    /// Label used in exported documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A relation found while crawling one account. Never stored; it becomes an edge right away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRelation {
    pub login: String,
    pub kind: RelationKind,
    pub repo: Option<String>,
    pub direction: EdgeDirection,
}

impl DiscoveredRelation {
    pub fn new(login: impl Into<String>, kind: RelationKind, repo: Option<String>) -> Self {
        Self {
            login: login.into(),
            kind,
            repo,
            direction: kind.direction(),
        }
    }

    /// Flip the conventional direction, for relations where the crawled account is the actor
    /// of a kind that normally points at it (e.g. the crawled account starred someone's repo).
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.direction = self.direction.reversed();
        self
    }

    /// `(source, target)` of the edge this relation produces.
    #[must_use]
    pub fn endpoints<'a>(&'a self, crawled: &'a str) -> (&'a str, &'a str) {
        match self.direction {
            EdgeDirection::FromDiscovered => (&self.login, crawled),
            EdgeDirection::FromCrawled => (crawled, &self.login),
        }
    }
}
