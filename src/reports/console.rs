use crate::Result;
use crate::spider::{CrawlReport, GraphView, RelationKind};
use core::fmt::{self, Write};
use owo_colors::OwoColorize;
use std::collections::{BTreeMap, HashMap};
use strum::IntoEnumIterator;

const TOP_ACCOUNTS: usize = 10;
const LABEL_WIDTH: usize = 22;
const SEPARATOR_WIDTH: usize = 40;

/// Write a human-readable summary of a finished crawl.
pub fn generate<W: Write>(view: &GraphView<'_>, report: &CrawlReport, use_colors: bool, writer: &mut W) -> Result<()> {
    ConsoleReporter { writer, use_colors }.generate_report(view, report)?;
    Ok(())
}

struct ConsoleReporter<'a, W: Write> {
    writer: &'a mut W,
    use_colors: bool,
}

impl<W: Write> ConsoleReporter<'_, W> {
    fn generate_report(&mut self, view: &GraphView<'_>, report: &CrawlReport) -> fmt::Result {
        let edges = view.edges();

        self.write_heading(&format!("Social graph around {}", report.seed))?;
        self.write_row("Accounts", &view.node_count().to_string())?;
        self.write_row("Relationships", &edges.len().to_string())?;
        self.write_row("Levels completed", &report.levels_completed.to_string())?;
        if report.budget_reached {
            self.write_note("Node budget reached, the crawl stopped early")?;
        }
        if report.cancelled {
            self.write_note("Crawl cancelled, the graph is partial")?;
        }

        self.write_heading("Relationships by kind")?;
        for kind in RelationKind::iter() {
            let (count, weight) = edges
                .iter()
                .filter(|edge| edge.kind == kind)
                .fold((0_u64, 0_u64), |(count, weight), edge| (count + 1, weight + edge.weight));
            if count > 0 {
                self.write_row(kind.as_str(), &format!("{count} ({weight} observations)"))?;
            }
        }

        self.write_heading("Accounts by depth")?;
        let mut depths = BTreeMap::new();
        for node in view.nodes() {
            *depths.entry(node.depth).or_insert(0_usize) += 1;
        }
        for (depth, count) in depths {
            self.write_row(&format!("depth {depth}"), &count.to_string())?;
        }

        let top = top_accounts(view);
        if !top.is_empty() {
            self.write_heading("Most connected accounts")?;
            for (label, weight) in top {
                self.write_row(&label, &weight.to_string())?;
            }
        }

        self.write_heading("GitHub API usage")?;
        self.write_row("Calls", &report.stats.api_calls.to_string())?;
        self.write_row("Failed", &report.stats.failed_calls.to_string())?;
        self.write_row("Rate limited", &report.stats.rate_limited_calls.to_string())?;
        self.write_row("Profiles fetched", &report.stats.profiles_fetched.to_string())?;

        Ok(())
    }

    fn write_heading(&mut self, text: &str) -> fmt::Result {
        writeln!(self.writer)?;
        if self.use_colors {
            writeln!(self.writer, "{}", text.bold())?;
            writeln!(self.writer, "{}", "─".repeat(SEPARATOR_WIDTH).dimmed())
        } else {
            writeln!(self.writer, "{text}")?;
            writeln!(self.writer, "{}", "─".repeat(SEPARATOR_WIDTH))
        }
    }

    fn write_row(&mut self, label: &str, value: &str) -> fmt::Result {
        if self.use_colors {
            writeln!(self.writer, "  {:<LABEL_WIDTH$} {}", label, value.cyan())
        } else {
            writeln!(self.writer, "  {label:<LABEL_WIDTH$} {value}")
        }
    }

    fn write_note(&mut self, text: &str) -> fmt::Result {
        if self.use_colors {
            writeln!(self.writer, "  {}", text.yellow())
        } else {
            writeln!(self.writer, "  {text}")
        }
    }
}

/// Accounts with the highest accumulated weight over their incoming and outgoing edges.
fn top_accounts(view: &GraphView<'_>) -> Vec<(String, u64)> {
    let mut weights: HashMap<&str, u64> = HashMap::new();
    for edge in view.edges() {
        *weights.entry(edge.source.as_str()).or_default() += edge.weight;
        *weights.entry(edge.target.as_str()).or_default() += edge.weight;
    }

    let mut ranked: Vec<_> = weights.into_iter().collect();
    ranked.sort_by(|(a_login, a_weight), (b_login, b_weight)| b_weight.cmp(a_weight).then_with(|| a_login.cmp(b_login)));

    ranked
        .into_iter()
        .take(TOP_ACCOUNTS)
        .map(|(login, weight)| {
            let label = view.node(login).map_or_else(|| login.to_string(), |node| node.label());
            (label, weight)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spider::{AccountNode, AccountProfile, FetchSummary, GraphStore};

    fn node(login: &str, name: Option<&str>, depth: usize) -> AccountNode {
        AccountNode::new(
            AccountProfile {
                login: login.to_string(),
                name: name.map(ToString::to_string),
                ..AccountProfile::default()
            },
            depth,
        )
    }

    fn report(store: &GraphStore) -> CrawlReport {
        CrawlReport {
            seed: "alice".to_string(),
            levels_completed: 1,
            cancelled: false,
            budget_reached: false,
            nodes: store.node_count(),
            edges: store.edge_count(),
            stats: FetchSummary {
                api_calls: 12,
                failed_calls: 1,
                rate_limited_calls: 0,
                profiles_fetched: 2,
            },
        }
    }

    fn sample() -> GraphStore {
        let store = GraphStore::new();
        let _ = store.add_node(node("alice", Some("Alice"), 0));
        let _ = store.add_node(node("bob", None, 1));
        let _ = store.add_node(node("carol", None, 1));
        store.add_edge("bob", "alice", RelationKind::Follower, None);
        store.add_edge("carol", "alice", RelationKind::Stargazer, Some("alice/tool"));
        store.add_edge("carol", "alice", RelationKind::Stargazer, Some("alice/tool"));
        store.add_edge("alice", "ghost", RelationKind::Follows, None);
        store
    }

    #[test]
    fn test_plain_summary() {
        let store = sample();
        let mut out = String::new();
        generate(&store.view(), &report(&store), false, &mut out).unwrap();

        assert!(out.contains("Social graph around alice"));
        assert!(out.contains("  Accounts               3\n"));
        assert!(out.contains("  Relationships          2\n"));
        assert!(out.contains("  follower               1 (1 observations)\n"));
        assert!(out.contains("  stargazer              1 (2 observations)\n"));
        assert!(!out.contains("follows"));
        assert!(out.contains("  depth 0                1\n"));
        assert!(out.contains("  depth 1                2\n"));
        assert!(out.contains("  Calls                  12\n"));
        assert!(!out.contains("ghost"));
        assert!(!out.contains('\u{1b}'));
    }

    #[test]
    fn test_top_accounts_order() {
        let store = sample();
        let top = top_accounts(&store.view());
        assert_eq!(
            top,
            vec![
                ("Alice (alice)".to_string(), 3),
                ("carol".to_string(), 2),
                ("bob".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_notes_for_partial_crawls() {
        let store = sample();
        let mut crawl = report(&store);
        crawl.cancelled = true;
        crawl.budget_reached = true;

        let mut out = String::new();
        generate(&store.view(), &crawl, false, &mut out).unwrap();
        assert!(out.contains("Node budget reached"));
        assert!(out.contains("Crawl cancelled"));
    }

    #[test]
    fn test_colored_summary_uses_escapes() {
        let store = sample();
        let mut out = String::new();
        generate(&store.view(), &report(&store), true, &mut out).unwrap();
        assert!(out.contains('\u{1b}'));
        assert!(out.contains("Social graph around alice"));
    }
}
