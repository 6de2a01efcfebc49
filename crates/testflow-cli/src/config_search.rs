//! Config file resolution: an explicit `-c` path wins outright; otherwise
//! the first of a fixed set of conventional names that exists on disk.

use std::path::{Path, PathBuf};

const CONVENTIONAL_NAMES: &[&str] = &[
    "flow-test.config.yml",
    "flow-test.config.yaml",
    "flow-test.yml",
    "flow-test.yaml",
];

/// Resolve which config file to load, if any. Returns `None` when nothing
/// matches, in which case the caller falls back to `EngineConfig::default()`.
pub fn resolve(explicit: Option<&Path>, search_root: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    CONVENTIONAL_NAMES
        .iter()
        .map(|name| search_root.join(name))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_path_wins_even_if_it_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.yml");
        assert_eq!(resolve(Some(&explicit), dir.path()), Some(explicit));
    }

    #[test]
    fn falls_back_to_first_matching_conventional_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("flow-test.yml"), "project_name: x\n").unwrap();
        assert_eq!(resolve(None, dir.path()), Some(dir.path().join("flow-test.yml")));
    }

    #[test]
    fn config_yml_is_preferred_over_yaml_variants() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("flow-test.yml"), "").unwrap();
        fs::write(dir.path().join("flow-test.config.yml"), "").unwrap();
        assert_eq!(resolve(None, dir.path()), Some(dir.path().join("flow-test.config.yml")));
    }

    #[test]
    fn none_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve(None, dir.path()), None);
    }
}
