//! Host-facing navigator for one archive.
//!
//! Owns the index, the current [`NavigationState`] and the visible listing,
//! and replaces state and listing together on every transition. Only the
//! extraction runs elsewhere, and it never sees navigation state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::archive::{ArchiveEntry, ArchiveIndex};
use crate::error::{NavError, NavResult};
use crate::nav::{Back, NavigationState, Step, visible_entries};
use crate::opener::{Launcher, OpenOutcome, dispatch};
use crate::unpack::{LazyExtractor, NoProgress, PendingOpen, ProgressIndicator};

/// Result of activating a listed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A directory was entered and the listing replaced
    Entered,
    /// A file was chosen; open it with [`Navigator::open_entry`]
    File(ArchiveEntry),
}

/// Result of going back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    Ascended,
    /// Already at the top; the host should close the archive view
    Exited,
}

pub struct Navigator {
    index: Arc<ArchiveIndex>,
    state: NavigationState,
    visible: Vec<ArchiveEntry>,
    unpacker: LazyExtractor,
}

impl Navigator {
    /// Open an archive with no progress indicator
    pub async fn open(path: &Path) -> NavResult<Self> {
        Self::open_with_progress(path, Arc::new(NoProgress)).await
    }

    pub async fn open_with_progress(
        path: &Path,
        progress: Arc<dyn ProgressIndicator>,
    ) -> NavResult<Self> {
        let index = Arc::new(ArchiveIndex::open(path).await?);
        let state = NavigationState::initial(index.layout());
        let visible = visible_entries(index.entries(), &state);
        let unpacker = LazyExtractor::new(&index, progress);
        Ok(Self {
            index,
            state,
            visible,
            unpacker,
        })
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Entries of the current directory, in display order
    pub fn visible(&self) -> &[ArchiveEntry] {
        &self.visible
    }

    pub fn unpacker(&self) -> &LazyExtractor {
        &self.unpacker
    }

    /// Position of a visible entry by name, with or without trailing `/`
    pub fn position_of(&self, name: &str) -> Option<usize> {
        let wanted = name.strip_suffix('/').unwrap_or(name);
        self.visible.iter().position(|entry| {
            let entry_name = entry.name();
            entry_name.strip_suffix('/').unwrap_or(&entry_name) == wanted
        })
    }

    fn entry_at(&self, position: usize) -> NavResult<&ArchiveEntry> {
        self.visible
            .get(position)
            .ok_or(NavError::NoSuchEntry { position })
    }

    /// Enter the directory at `position`, or report the file there
    pub fn enter(&mut self, position: usize) -> NavResult<Activation> {
        let entry = self.entry_at(position)?.clone();
        match self.state.enter(&entry) {
            Step::Descend(next) => {
                debug!(path = %next.current(), depth = next.depth_bound(), "entered directory");
                self.visible = visible_entries(self.index.entries(), &next);
                self.state = next;
                Ok(Activation::Entered)
            }
            Step::Open => Ok(Activation::File(entry)),
        }
    }

    pub fn back(&mut self) -> BackOutcome {
        match self.state.back() {
            Back::Ascend(next) => {
                debug!(path = %next.current(), depth = next.depth_bound(), "went back");
                self.visible = visible_entries(self.index.entries(), &next);
                self.state = next;
                BackOutcome::Ascended
            }
            Back::Exit => BackOutcome::Exited,
        }
    }

    /// Start making the file at `position` available on disk
    pub fn begin_open(&self, position: usize) -> NavResult<PendingOpen> {
        let entry = self.openable_at(position)?;
        self.unpacker.begin(entry)
    }

    /// Extract if needed, then hand the file to the best application
    pub async fn open_entry(
        &self,
        position: usize,
        launcher: &dyn Launcher,
    ) -> NavResult<(PathBuf, OpenOutcome)> {
        let path = self.begin_open(position)?.wait().await?;
        let outcome = dispatch(launcher, &path);
        Ok((path, outcome))
    }

    /// Decode the file at `position` without writing anything to disk
    pub async fn read_entry(&self, position: usize) -> NavResult<Vec<u8>> {
        let entry = self.openable_at(position)?;
        let record = self
            .index
            .record(entry)
            .ok_or(NavError::NoSuchEntry { position })?;
        self.index
            .extractor()
            .read_entry(record)
            .await
            .map_err(|e| NavError::extraction(self.index.path(), &e))
    }

    fn openable_at(&self, position: usize) -> NavResult<&ArchiveEntry> {
        let entry = self.entry_at(position)?;
        if entry.is_malformed() {
            let name = self
                .index
                .record(entry)
                .map(|r| r.display_name())
                .unwrap_or_else(|| entry.path().to_string());
            return Err(NavError::MalformedEntry { name });
        }
        if entry.is_directory() {
            return Err(NavError::NoSuchEntry { position });
        }
        Ok(entry)
    }
}
