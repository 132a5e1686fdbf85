use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

use crate::{Context, Result};

/// On-disk shape of the channels document. Unknown fields are tolerated so
/// the file can carry other operator settings.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ChannelsDocument {
    required_channels: Vec<String>,
}

/// Ordered list of channel identifiers (`@handle` or numeric id) a user must
/// belong to before the monitored group accepts their messages.
///
/// The sequence order defines onboarding button order. An empty sequence
/// means everyone passes. Identifiers are unique; there is no removal
/// operation, dropping a channel means editing the document by hand.
pub struct ChannelRequirements {
    path: PathBuf,
    inner: Mutex<Vec<String>>,
}

impl ChannelRequirements {
    /// Open the store at `path`, loading the existing document if present.
    ///
    /// A missing or unparsable document yields an empty requirement list.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let channels = load_document(&path);
        debug!(path = %path.display(), count = channels.len(), "loaded channel requirements");
        Self {
            path,
            inner: Mutex::new(channels),
        }
    }

    /// Current requirement sequence, in policy order.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Append a channel identifier if it is not already required.
    ///
    /// Returns `false` without touching the document when the identifier is
    /// already present. The in-memory list is only updated once the document
    /// is on disk.
    pub fn add(&self, channel: &str) -> Result<bool> {
        let mut channels = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if channels.iter().any(|c| c == channel) {
            return Ok(false);
        }
        let mut next = channels.clone();
        next.push(channel.to_string());
        persist_document(&self.path, &next)?;
        *channels = next;
        Ok(true)
    }
}

fn load_document(path: &Path) -> Vec<String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no channels document, starting empty");
            return Vec::new();
        },
    };
    match serde_json::from_str::<ChannelsDocument>(&raw) {
        Ok(doc) => doc.required_channels,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt channels document, starting empty");
            Vec::new()
        },
    }
}

fn persist_document(path: &Path, required_channels: &[String]) -> Result<()> {
    let doc = ChannelsDocument {
        required_channels: required_channels.to_vec(),
    };
    let raw = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, raw).with_context(|| format!("write {}", path.display()))
}
