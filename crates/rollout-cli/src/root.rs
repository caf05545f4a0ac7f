use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "rollout.yaml";

/// Resolve the run-configuration path.
///
/// Priority:
/// 1. `--config` flag / `ROLLOUT_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `rollout.yaml`
/// 3. Fall back to `cwd/rollout.yaml`
pub fn resolve_config(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut dir = cwd.clone();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return candidate;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }

    cwd.join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        let result = resolve_config(Some(&path));
        assert_eq!(result, path);
    }
}
