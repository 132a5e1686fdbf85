use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{Context, Result};

/// Curated `name → url` mapping, persisted as a flat JSON object.
///
/// Entries are created and overwritten by the admin console and never
/// auto-deleted. Name order in the document carries no meaning; the map keeps
/// a stable sorted order so link buttons don't shuffle between restarts.
pub struct LinkStore {
    path: PathBuf,
    inner: Mutex<BTreeMap<String, String>>,
}

impl LinkStore {
    /// Open the store at `path`, loading the existing document if present.
    ///
    /// A missing or unparsable document yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let links = load_document(&path);
        debug!(path = %path.display(), count = links.len(), "loaded link store");
        Self {
            path,
            inner: Mutex::new(links),
        }
    }

    /// Current contents, cheapest way to render or iterate without holding
    /// the store lock.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Insert or overwrite a link and persist the whole document.
    ///
    /// The in-memory map is only updated once the document is on disk, so a
    /// persist failure leaves the store as it was.
    pub fn upsert(&self, name: &str, url: &str) -> Result<()> {
        let mut links = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = links.clone();
        next.insert(name.to_string(), url.to_string());
        persist_document(&self.path, &next)?;
        *links = next;
        Ok(())
    }
}

fn load_document(path: &Path) -> BTreeMap<String, String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no links document, starting empty");
            return BTreeMap::new();
        },
    };
    match serde_json::from_str(&raw) {
        Ok(links) => links,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt links document, starting empty");
            BTreeMap::new()
        },
    }
}

fn persist_document(path: &Path, links: &BTreeMap<String, String>) -> Result<()> {
    let raw = serde_json::to_string_pretty(links)?;
    std::fs::write(path, raw).with_context(|| format!("write {}", path.display()))
}
