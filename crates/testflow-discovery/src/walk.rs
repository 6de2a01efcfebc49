//! Suite file discovery: walk a test directory and keep files matching the
//! configured include patterns and none of the exclude patterns.

use std::path::{Path, PathBuf};

use glob::Pattern;
use testflow_core::config::DiscoveryConfig;
use walkdir::WalkDir;

use crate::error::DiscoveryError;

/// Walk `root` and return every file matching `config.patterns` and none of
/// `config.exclude`, sorted for a deterministic discovery order.
pub fn discover_suite_files(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let includes = compile_patterns(&config.patterns)?;
    let excludes = compile_patterns(&config.exclude)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| DiscoveryError::Walk(root.display().to_string(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if matches_any(&includes, relative) && !matches_any(&excludes, relative) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, DiscoveryError> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(|e| DiscoveryError::Pattern(p.clone(), e)))
        .collect()
}

fn matches_any(patterns: &[Pattern], path: &Path) -> bool {
    let path_str = path.to_string_lossy().replace('\\', "/");
    patterns.iter().any(|p| p.matches(&path_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_only_matching_suite_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.suite.yaml"), "").unwrap();
        fs::write(dir.path().join("nested/b.suite.yml"), "").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();

        let config = DiscoveryConfig {
            patterns: vec!["**/*.suite.yaml".to_string(), "**/*.suite.yml".to_string()],
            exclude: Vec::new(),
        };
        let found = discover_suite_files(dir.path(), &config).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn exclude_patterns_win_over_includes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("fixtures")).unwrap();
        fs::write(dir.path().join("a.suite.yaml"), "").unwrap();
        fs::write(dir.path().join("fixtures/skip.suite.yaml"), "").unwrap();

        let config = DiscoveryConfig {
            patterns: vec!["**/*.suite.yaml".to_string()],
            exclude: vec!["fixtures/**".to_string()],
        };
        let found = discover_suite_files(dir.path(), &config).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.suite.yaml"));
    }
}
