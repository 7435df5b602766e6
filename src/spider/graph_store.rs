use super::{AccountNode, RelationKind};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard};

/// Identity of an edge: re-observing the same triple adds weight instead of a new edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
}

/// A directed, typed, weighted connection between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub weight: u64,
    pub repo: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    nodes: HashMap<String, AccountNode>,
    edges: HashMap<EdgeKey, RelationshipEdge>,
}

/// Concurrent node/edge table with aggregation on insert.
///
/// Inserts take the write lock; counters and exports take the read lock, so a count
/// never observes a half-applied insert and an export sees a single point in time.
#[derive(Debug, Default)]
pub struct GraphStore {
    tables: RwLock<Tables>,
}

impl GraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` unless its login is already present. Existing nodes are never replaced.
    pub fn add_node(&self, node: AccountNode) -> bool {
        let mut tables = self.tables.write().expect("lock poisoned");
        if tables.nodes.contains_key(node.login()) {
            return false;
        }

        let _ = tables.nodes.insert(node.login().to_string(), node);
        true
    }

    #[must_use]
    pub fn has_node(&self, login: &str) -> bool {
        self.tables.read().expect("lock poisoned").nodes.contains_key(login)
    }

    /// Record one observation of `(source, target, kind)`.
    ///
    /// The first observation creates the edge with weight 1 and fixes its repository
    /// attribution; later observations only bump the weight.
    pub fn add_edge(&self, source: &str, target: &str, kind: RelationKind, repo: Option<&str>) {
        let key = EdgeKey {
            source: source.to_string(),
            target: target.to_string(),
            kind,
        };

        let mut tables = self.tables.write().expect("lock poisoned");
        let _ = tables
            .edges
            .entry(key)
            .and_modify(|edge| edge.weight += 1)
            .or_insert_with(|| RelationshipEdge {
                source: source.to_string(),
                target: target.to_string(),
                kind,
                weight: 1,
                repo: repo.map(ToString::to_string),
            });
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.tables.read().expect("lock poisoned").nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.tables.read().expect("lock poisoned").edges.len()
    }

    /// Hold the read lock for the lifetime of the returned view.
    #[must_use]
    pub fn view(&self) -> GraphView<'_> {
        GraphView {
            tables: self.tables.read().expect("lock poisoned"),
        }
    }
}

/// Read-locked view of a [`GraphStore`] with deterministic ordering, used by exporters.
#[derive(Debug)]
pub struct GraphView<'a> {
    tables: RwLockReadGuard<'a, Tables>,
}

impl GraphView<'_> {
    #[must_use]
    pub fn node(&self, login: &str) -> Option<&AccountNode> {
        self.tables.nodes.get(login)
    }

    /// All nodes, ordered by discovery depth then login.
    #[must_use]
    pub fn nodes(&self) -> Vec<&AccountNode> {
        let mut nodes: Vec<_> = self.tables.nodes.values().collect();
        nodes.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.login().cmp(b.login())));
        nodes
    }

    /// All edges ordered by `(source, target, kind)`, including those touching non-admitted accounts.
    #[must_use]
    pub fn all_edges(&self) -> Vec<&RelationshipEdge> {
        let mut edges: Vec<_> = self.tables.edges.values().collect();
        edges.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.target.cmp(&b.target))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        edges
    }

    /// Edges whose two endpoints are admitted nodes.
    ///
    /// Relations to accounts rejected by the filters or the node budget stay in the
    /// store but are pruned here, so exported documents never reference missing nodes.
    #[must_use]
    pub fn edges(&self) -> Vec<&RelationshipEdge> {
        self.all_edges()
            .into_iter()
            .filter(|edge| self.tables.nodes.contains_key(&edge.source) && self.tables.nodes.contains_key(&edge.target))
            .collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.tables.nodes.len()
    }
}
