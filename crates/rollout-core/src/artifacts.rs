use crate::error::{Result, RolloutError};
use crate::types::Component;
use alloy_primitives::Bytes;
use serde::Deserialize;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// One compiled contract artifact as the compiler's artifact store emits it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Creation bytecode (the deployment payload).
    pub bytecode: Bytes,
    /// Expected runtime bytecode, used by the drift check.
    pub deployed_bytecode: Bytes,
    /// Source-reference identifier for the verification service.
    #[serde(default)]
    pub source_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// ArtifactStore
// ---------------------------------------------------------------------------

/// Reads `<dir>/<component>.json` artifacts produced by the contract build.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, component: Component) -> Result<Artifact> {
        let path = self.dir.join(format!("{component}.json"));
        if !path.exists() {
            return Err(RolloutError::ArtifactNotFound {
                component: component.to_string(),
                dir: self.dir.clone(),
            });
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn has(&self, component: Component) -> bool {
        self.dir.join(format!("{component}.json")).exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_artifact_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("oracle.json"),
            r#"{"bytecode":"0x6080aa","deployedBytecode":"0x6080","sourceRef":"src/Oracle.sol:Oracle"}"#,
        )
        .unwrap();

        let store = ArtifactStore::new(dir.path());
        assert!(store.has(Component::Oracle));
        let artifact = store.load(Component::Oracle).unwrap();
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0xaa]);
        assert_eq!(artifact.source_ref.as_deref(), Some("src/Oracle.sol:Oracle"));
    }

    #[test]
    fn missing_artifact_is_explicit() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(!store.has(Component::Pool));
        let err = store.load(Component::Pool).unwrap_err();
        assert!(matches!(err, RolloutError::ArtifactNotFound { .. }));
    }
}
