//! Suite-set narrowing: CLI filter flags layered on top of the config
//! file's own `filters` section before the graph goes to the scheduler.

use std::collections::HashSet;

use testflow_core::config::FiltersConfig;
use testflow_core::priority::Priority;
use testflow_discovery::DiscoveredSuite;

/// The resolved set of filters a run applies, merged from `--priority`,
/// `--suite`/`--node` (treated as one filter), `--tag`, and the config
/// file's `filters` section. CLI flags add to, never replace, the config.
#[derive(Debug, Clone, Default)]
pub struct RunFilters {
    pub priorities: HashSet<Priority>,
    pub node_ids: HashSet<String>,
    pub tags: HashSet<String>,
    pub exclude_tags: HashSet<String>,
}

impl RunFilters {
    pub fn build(
        config: &FiltersConfig,
        cli_priority: &[String],
        cli_suite: &[String],
        cli_node: &[String],
        cli_tag: &[String],
    ) -> Result<Self, String> {
        let mut priorities = HashSet::new();
        for raw in cli_priority {
            priorities.insert(raw.parse::<Priority>()?);
        }

        let mut node_ids: HashSet<String> = config.node_ids.iter().cloned().collect();
        node_ids.extend(cli_suite.iter().cloned());
        node_ids.extend(cli_node.iter().cloned());

        let mut tags: HashSet<String> = config.tags.iter().cloned().collect();
        tags.extend(cli_tag.iter().cloned());

        Ok(Self {
            priorities,
            node_ids,
            tags,
            exclude_tags: config.exclude_tags.iter().cloned().collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty() && self.node_ids.is_empty() && self.tags.is_empty() && self.exclude_tags.is_empty()
    }

    pub fn matches(&self, discovered: &DiscoveredSuite) -> bool {
        let suite = &discovered.suite;

        if !self.priorities.is_empty() && !self.priorities.contains(&suite.priority) {
            return false;
        }
        if !self.node_ids.is_empty() && !self.node_ids.contains(suite.node_id.as_str()) {
            return false;
        }
        if !self.tags.is_empty() && !suite.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if suite.tags.iter().any(|t| self.exclude_tags.contains(t)) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testflow_core::suite::Suite;
    use std::path::PathBuf;

    fn suite(yaml: &str) -> DiscoveredSuite {
        DiscoveredSuite {
            suite: Suite::from_yaml(yaml, "inline").unwrap(),
            path: PathBuf::from("inline"),
        }
    }

    #[test]
    fn no_filters_matches_everything() {
        let filters = RunFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches(&suite("node_id: a\nsteps: []\n")));
    }

    #[test]
    fn priority_filter_excludes_non_matching() {
        let filters = RunFilters {
            priorities: HashSet::from([Priority::Critical]),
            ..Default::default()
        };
        assert!(!filters.matches(&suite("node_id: a\npriority: low\nsteps: []\n")));
        assert!(filters.matches(&suite("node_id: b\npriority: critical\nsteps: []\n")));
    }

    #[test]
    fn tag_filter_requires_at_least_one_match() {
        let filters = RunFilters {
            tags: HashSet::from(["smoke".to_string()]),
            ..Default::default()
        };
        assert!(!filters.matches(&suite("node_id: a\ntags: [regression]\nsteps: []\n")));
        assert!(filters.matches(&suite("node_id: b\ntags: [smoke, regression]\nsteps: []\n")));
    }

    #[test]
    fn exclude_tag_wins_even_if_an_include_tag_also_matches() {
        let filters = RunFilters {
            tags: HashSet::from(["smoke".to_string()]),
            exclude_tags: HashSet::from(["flaky".to_string()]),
            ..Default::default()
        };
        assert!(!filters.matches(&suite("node_id: a\ntags: [smoke, flaky]\nsteps: []\n")));
    }

    #[test]
    fn cli_suite_and_node_flags_merge_into_one_set() {
        let config = FiltersConfig::default();
        let filters = RunFilters::build(&config, &[], &["a".to_string()], &["b".to_string()], &[]).unwrap();
        assert_eq!(filters.node_ids, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn invalid_priority_string_is_an_error() {
        let config = FiltersConfig::default();
        assert!(RunFilters::build(&config, &["urgent".to_string()], &[], &[], &[]).is_err());
    }
}
