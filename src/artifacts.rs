//! Per-tab artifacts kept outside the session file (screenshots for the tab
//! switcher). Closing a tab discards them.

use crate::tab::TabId;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Storage for files tied to a tab's lifetime
pub trait ArtifactStore: Send {
    fn save(&self, tab: TabId, bytes: &[u8]) -> Result<()>;

    fn load(&self, tab: TabId) -> Result<Option<Vec<u8>>>;

    /// Remove everything stored for `tab`. Returns whether anything existed.
    fn discard(&self, tab: TabId) -> Result<bool>;
}

/// One PNG per tab in a directory
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    dir: PathBuf,
}

impl ScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, tab: TabId) -> PathBuf {
        self.dir.join(format!("{tab}.png"))
    }
}

impl ArtifactStore for ScreenshotStore {
    fn save(&self, tab: TabId, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create screenshot directory {:?}", self.dir))?;
        let path = self.path_for(tab);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write screenshot {:?}", path))?;
        Ok(())
    }

    fn load(&self, tab: TabId) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(tab);
        if !path.exists() {
            return Ok(None);
        }
        let bytes =
            std::fs::read(&path).with_context(|| format!("Failed to read screenshot {:?}", path))?;
        Ok(Some(bytes))
    }

    fn discard(&self, tab: TabId) -> Result<bool> {
        let path = self.path_for(tab);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove screenshot {:?}", path))?;
        log::debug!("Discarded screenshot for tab {}", tab);
        Ok(true)
    }
}
