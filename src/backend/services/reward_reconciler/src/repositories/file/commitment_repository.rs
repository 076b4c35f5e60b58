use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::repositories::traits::CommitmentRepository;
use crate::utils::merkle::TreeDump;

/// Stores the tree dump as pretty JSON at a fixed path.
pub struct FileCommitmentRepository {
    path: PathBuf,
}

impl FileCommitmentRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CommitmentRepository for FileCommitmentRepository {
    async fn save(&self, dump: &TreeDump) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so a reader never sees a half-written tree.
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(dump)?;
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("moving tree dump to {}", self.path.display()))?;

        Ok(())
    }

    async fn load(&self) -> Result<Option<TreeDump>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let dump = serde_json::from_slice(&bytes)
                    .with_context(|| format!("parsing {}", self.path.display()))?;
                Ok(Some(dump))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }
}
