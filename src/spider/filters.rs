/// Admission policy applied to every discovered account.
///
/// A zero threshold means "no minimum" and a zero `max_nodes` means "unbounded".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlFilters {
    pub min_followers: u64,
    pub min_repos: u64,
    pub max_nodes: usize,
}

impl CrawlFilters {
    #[must_use]
    pub const fn new(min_followers: u64, min_repos: u64, max_nodes: usize) -> Self {
        Self {
            min_followers,
            min_repos,
            max_nodes,
        }
    }

    /// Whether a profile with these counts may become a node.
    #[must_use]
    pub const fn admits_profile(&self, followers: u64, public_repos: u64) -> bool {
        followers >= self.min_followers && public_repos >= self.min_repos
    }

    /// Whether the graph already holds as many nodes as allowed.
    #[must_use]
    pub const fn budget_reached(&self, node_count: usize) -> bool {
        self.max_nodes > 0 && node_count >= self.max_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_thresholds_admit_everything() {
        let filters = CrawlFilters::default();
        assert!(filters.admits_profile(0, 0));
        assert!(filters.admits_profile(1_000_000, 0));
    }

    #[test]
    fn test_min_followers() {
        let filters = CrawlFilters::new(10, 0, 0);
        assert!(!filters.admits_profile(9, 100));
        assert!(filters.admits_profile(10, 0));
    }

    #[test]
    fn test_min_repos() {
        let filters = CrawlFilters::new(0, 3, 0);
        assert!(!filters.admits_profile(500, 2));
        assert!(filters.admits_profile(0, 3));
    }

    #[test]
    fn test_budget() {
        let filters = CrawlFilters::new(0, 0, 5);
        assert!(!filters.budget_reached(4));
        assert!(filters.budget_reached(5));
        assert!(filters.budget_reached(6));
    }

    #[test]
    fn test_zero_budget_is_unbounded() {
        assert!(!CrawlFilters::new(0, 0, 0).budget_reached(usize::MAX));
    }
}
