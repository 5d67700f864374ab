//! Persistence for the excluded-application list.
//!
//! The list survives restarts as a plain text file, one application
//! identifier per line. Saving rewrites the whole file; the sets are
//! small enough that anything smarter would be noise.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use tracing::debug;

/// Flat-file store for excluded application identifiers.
pub struct ExclusionStore {
    path: PathBuf,
}

impl ExclusionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted set; a missing file is an empty set.
    pub fn load(&self) -> BTreeSet<String> {
        let Ok(contents) = std::fs::read_to_string(&self.path) else {
            debug!("no exclusions at {}; starting empty", self.path.display());
            return BTreeSet::new();
        };
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Persist the set, replacing any previous contents.
    pub fn save(&self, apps: &BTreeSet<String>) -> io::Result<()> {
        let mut text = String::new();
        for app in apps {
            text.push_str(app);
            text.push('\n');
        }
        std::fs::write(&self.path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────
