use crate::archive::{ArchiveEntry, Layout};

use super::path::EntryPath;

/// Depth bound at the effective root
pub const BASE_DEPTH: usize = 3;

/// Where the user is inside the archive.
///
/// A value type: transitions return a new state instead of mutating.
/// `depth_bound` is derived from the path, so descending raises it by
/// one, ascending lowers it by one, and it cannot drift from the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    root: EntryPath,
    current: EntryPath,
}

/// Result of activating an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A directory was entered
    Descend(NavigationState),
    /// A file was chosen; the state stays as it was
    Open,
}

/// Result of going back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Back {
    Ascend(NavigationState),
    /// Already at the effective root; the host should leave the archive
    Exit,
}

impl NavigationState {
    pub fn initial(layout: &Layout) -> Self {
        let root = layout.effective_root();
        Self {
            current: root.clone(),
            root,
        }
    }

    /// Directory whose children are listed
    pub fn current(&self) -> &EntryPath {
        &self.current
    }

    /// Top of navigation: the archive root, or the wrapping folder
    pub fn root(&self) -> &EntryPath {
        &self.root
    }

    pub fn depth_bound(&self) -> usize {
        BASE_DEPTH + self.current.len() - self.root.len()
    }

    pub fn is_single_folder_archive(&self) -> bool {
        !self.root.is_root()
    }

    pub fn at_root(&self) -> bool {
        self.current == self.root
    }

    pub fn enter(&self, entry: &ArchiveEntry) -> Step {
        if !entry.is_directory() {
            return Step::Open;
        }
        debug_assert!(entry.segments().is_child_of(&self.current));
        Step::Descend(Self {
            root: self.root.clone(),
            current: entry.segments().clone(),
        })
    }

    pub fn back(&self) -> Back {
        if self.depth_bound() <= BASE_DEPTH {
            return Back::Exit;
        }
        match self.current.parent() {
            Some(parent) => Back::Ascend(Self {
                root: self.root.clone(),
                current: parent,
            }),
            None => Back::Exit,
        }
    }
}
