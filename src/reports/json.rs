use crate::Result;
use crate::spider::GraphView;
use core::fmt::Write;
use serde_json::json;

/// Write the admitted accounts and the edges between them as a JSON document.
pub fn generate<W: Write>(view: &GraphView<'_>, seed: &str, writer: &mut W) -> Result<()> {
    let output = json!({
        "seed": seed,
        "nodes": view.nodes(),
        "edges": view.edges(),
    });

    write!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spider::{AccountNode, AccountProfile, GraphStore, RelationKind};
    use serde_json::Value;

    fn node(login: &str, followers: u64, depth: usize) -> AccountNode {
        AccountNode::new(
            AccountProfile {
                login: login.to_string(),
                followers,
                location: Some("Lisbon".to_string()),
                ..AccountProfile::default()
            },
            depth,
        )
    }

    #[test]
    fn test_document_shape() {
        let store = GraphStore::new();
        let _ = store.add_node(node("alice", 10, 0));
        let _ = store.add_node(node("bob", 50, 1));
        store.add_edge("bob", "alice", RelationKind::Follower, None);
        store.add_edge("alice", "bob", RelationKind::CommitAuthor, Some("alice/tool"));
        store.add_edge("alice", "bob", RelationKind::CommitAuthor, Some("alice/tool"));

        let mut out = String::new();
        generate(&store.view(), "alice", &mut out).unwrap();
        let doc: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(doc["seed"], "alice");

        let nodes = doc["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["login"], "alice");
        assert_eq!(nodes[0]["depth"], 0);
        assert_eq!(nodes[1]["login"], "bob");
        assert_eq!(nodes[1]["followers"], 50);
        assert_eq!(nodes[1]["location"], "Lisbon");
        assert_eq!(nodes[1]["name"], Value::Null);

        let edges = doc["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0]["source"], "alice");
        assert_eq!(edges[0]["type"], "commit-author");
        assert_eq!(edges[0]["weight"], 2);
        assert_eq!(edges[0]["repo"], "alice/tool");
        assert_eq!(edges[1]["type"], "follower");
        assert_eq!(edges[1]["repo"], Value::Null);
    }

    #[test]
    fn test_dangling_edges_are_left_out() {
        let store = GraphStore::new();
        let _ = store.add_node(node("alice", 10, 0));
        store.add_edge("alice", "ghost", RelationKind::Follows, None);

        let mut out = String::new();
        generate(&store.view(), "alice", &mut out).unwrap();
        let doc: Value = serde_json::from_str(&out).unwrap();

        assert!(doc["edges"].as_array().unwrap().is_empty());
    }
}
