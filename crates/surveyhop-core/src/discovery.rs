//! Tunnel configuration discovery.

use std::path::Path;

use tracing::debug;

use crate::config::TunnelConfig;
use crate::error::TunnelError;

/// Collect `.ovpn` files directly under `dir`, sorted by path.
///
/// `limit` caps how many configurations the run will touch; `None` means
/// all of them. An empty result is not an error here, the caller decides
/// whether that is fatal.
pub fn discover_configs(
    dir: &Path,
    limit: Option<usize>,
) -> Result<Vec<TunnelConfig>, TunnelError> {
    let pattern = dir.join("*.ovpn");
    let pattern = pattern.to_string_lossy();

    let entries = glob::glob(&pattern).map_err(|e| {
        TunnelError::Configuration(format!("invalid config pattern {}: {}", pattern, e))
    })?;

    let mut paths: Vec<_> = entries.filter_map(Result::ok).collect();
    paths.sort();

    if let Some(limit) = limit {
        paths.truncate(limit);
    }

    debug!(
        "Found {} tunnel configurations in {}",
        paths.len(),
        dir.display()
    );
    Ok(paths.into_iter().map(TunnelConfig::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "remote example 1194\n").unwrap();
    }

    #[test]
    fn test_discovers_sorted_ovpn_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b-vienna.ovpn");
        touch(dir.path(), "a-prague.ovpn");
        touch(dir.path(), "notes.txt");

        let configs = discover_configs(dir.path(), None).unwrap();
        let names: Vec<_> = configs.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a-prague", "b-vienna"]);
    }

    #[test]
    fn test_limit_truncates() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.ovpn");
        touch(dir.path(), "b.ovpn");
        touch(dir.path(), "c.ovpn");

        let configs = discover_configs(dir.path(), Some(2)).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].name(), "a");
        assert_eq!(configs[1].name(), "b");
    }

    #[test]
    fn test_empty_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let configs = discover_configs(dir.path(), None).unwrap();
        assert!(configs.is_empty());
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("does-not-exist");
        let configs = discover_configs(&gone, None).unwrap();
        assert!(configs.is_empty());
    }
}
