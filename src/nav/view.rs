use std::cmp::Ordering;

use crate::archive::ArchiveEntry;

use super::state::NavigationState;

/// Direct children of the state's current directory, sorted.
///
/// Placeholder entries for unparseable names are listed at the
/// effective root. The wrapping folder of a single-folder archive is
/// never listed, since navigation starts inside it.
pub fn visible_entries(entries: &[ArchiveEntry], state: &NavigationState) -> Vec<ArchiveEntry> {
    let current = state.current();
    let mut visible: Vec<ArchiveEntry> = entries
        .iter()
        .filter(|entry| {
            if entry.is_malformed() {
                state.at_root()
            } else {
                entry.segments().is_child_of(current)
            }
        })
        .cloned()
        .collect();
    sort_entries(&mut visible);
    visible
}

/// Directories first, then case-insensitive by path, then case-sensitive
pub fn sort_entries(entries: &mut [ArchiveEntry]) {
    entries.sort_by(compare_entries);
}

fn compare_entries(a: &ArchiveEntry, b: &ArchiveEntry) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| a.path().to_lowercase().cmp(&b.path().to_lowercase()))
        .then_with(|| a.path().cmp(b.path()))
}
