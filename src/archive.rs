//! Archive index: the entries of one zip archive, ready for browsing.
//!
//! Every central directory record becomes an [`ArchiveEntry`]. Records
//! whose names cannot be used as paths are replaced by a sentinel entry
//! called `unknown` so the rest of the listing survives. Parent
//! directories the archive never lists on their own are added, which
//! keeps every file reachable by walking down from the root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{NavError, NavResult};
use crate::io::LocalFileReader;
use crate::nav::EntryPath;
use crate::zip::{ZipExtractor, ZipRecord};

/// Path shown for entries whose names could not be parsed
pub const UNKNOWN_ENTRY: &str = "unknown";

/// One file or directory inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    path: String,
    segments: EntryPath,
    is_directory: bool,
    size: u64,
    record: Option<usize>,
    malformed: bool,
}

impl ArchiveEntry {
    fn from_record(segments: EntryPath, record: &ZipRecord, index: usize) -> Self {
        let is_directory = record.is_directory();
        Self {
            path: display_path(&segments, is_directory),
            segments,
            is_directory,
            size: record.uncompressed_size,
            record: Some(index),
            malformed: false,
        }
    }

    fn unknown(record: &ZipRecord, index: usize) -> Self {
        Self {
            path: UNKNOWN_ENTRY.to_string(),
            segments: EntryPath::root(),
            is_directory: false,
            size: record.uncompressed_size,
            record: Some(index),
            malformed: true,
        }
    }

    fn implicit_directory(segments: EntryPath) -> Self {
        Self {
            path: display_path(&segments, true),
            segments,
            is_directory: true,
            size: 0,
            record: None,
            malformed: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(name: &str) -> Self {
        let segments = EntryPath::parse(name).expect("valid test entry name");
        let is_directory = name.ends_with('/');
        Self {
            path: display_path(&segments, is_directory),
            segments,
            is_directory,
            size: 0,
            record: None,
            malformed: false,
        }
    }

    /// Full slash-separated path; directories end with `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &EntryPath {
        &self.segments
    }

    /// Last path segment, with a trailing `/` for directories
    pub fn name(&self) -> String {
        match self.segments.name() {
            Some(name) if self.is_directory => format!("{}/", name),
            Some(name) => name.to_string(),
            None => self.path.clone(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// True for the `unknown` placeholder of an unparseable name
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// True for directories implied by deeper entries but not stored
    pub fn is_implicit(&self) -> bool {
        self.record.is_none()
    }
}

fn display_path(segments: &EntryPath, is_directory: bool) -> String {
    if is_directory {
        format!("{}/", segments)
    } else {
        segments.to_string()
    }
}

/// How the archive's top level is arranged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Files and folders stored directly at the top level
    Loose,
    /// Everything wrapped in one top-level folder with this name
    SingleFolder(String),
}

impl Layout {
    /// Directory the user starts in
    pub fn effective_root(&self) -> EntryPath {
        match self {
            Layout::Loose => EntryPath::root(),
            Layout::SingleFolder(name) => EntryPath::root().child(name),
        }
    }

    /// Inspect the valid entries' first segments
    pub fn detect(entries: &[ArchiveEntry]) -> Layout {
        let mut valid = entries.iter().filter(|e| !e.is_malformed()).peekable();
        let Some(first) = valid.peek() else {
            return Layout::Loose;
        };
        let Some(top) = first.segments().segments().first().cloned() else {
            return Layout::Loose;
        };

        let wrapped = valid.all(|entry| {
            let segments = entry.segments().segments();
            segments[0] == top && (segments.len() > 1 || entry.is_directory())
        });

        if wrapped {
            Layout::SingleFolder(top)
        } else {
            Layout::Loose
        }
    }
}

/// The parsed contents of one archive on disk
pub struct ArchiveIndex {
    path: PathBuf,
    extractor: Arc<ZipExtractor<LocalFileReader>>,
    records: Arc<Vec<ZipRecord>>,
    entries: Vec<ArchiveEntry>,
    layout: Layout,
}

impl ArchiveIndex {
    /// Open an archive and index its entries.
    ///
    /// Fails with [`NavError::ArchiveUnreadable`] when the file cannot be
    /// read or its central directory is broken. A bad entry name never
    /// fails the open.
    pub async fn open(path: &Path) -> NavResult<Self> {
        let reader = LocalFileReader::new(path).map_err(|e| NavError::unreadable(path, &e))?;
        let extractor = Arc::new(ZipExtractor::new(Arc::new(reader)));
        let records = extractor
            .list_records()
            .await
            .map_err(|e| NavError::unreadable(path, &e))?;

        let entries = build_entries(&records);
        let layout = Layout::detect(&entries);
        info!(
            archive = %path.display(),
            records = records.len(),
            entries = entries.len(),
            ?layout,
            "opened archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            extractor,
            records: Arc::new(records),
            entries,
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every entry, including sentinels and implied directories
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The central directory record behind an entry
    pub fn record(&self, entry: &ArchiveEntry) -> Option<&ZipRecord> {
        entry.record.and_then(|i| self.records.get(i))
    }

    pub(crate) fn records(&self) -> &Arc<Vec<ZipRecord>> {
        &self.records
    }

    pub(crate) fn extractor(&self) -> &Arc<ZipExtractor<LocalFileReader>> {
        &self.extractor
    }

    /// Relative output path for every record, `None` for unusable names
    pub(crate) fn record_targets(&self) -> Vec<Option<PathBuf>> {
        let mut targets = vec![None; self.records.len()];
        for entry in &self.entries {
            if let (Some(i), false) = (entry.record, entry.malformed) {
                targets[i] = Some(entry.segments.to_relative_path());
            }
        }
        targets
    }
}

fn build_entries(records: &[ZipRecord]) -> Vec<ArchiveEntry> {
    let mut entries = Vec::with_capacity(records.len());
    let mut directories = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let parsed = std::str::from_utf8(&record.raw_name)
            .map_err(|_| NavError::MalformedEntry {
                name: record.display_name(),
            })
            .and_then(EntryPath::parse);

        match parsed {
            Ok(segments) => {
                let entry = ArchiveEntry::from_record(segments, record, index);
                if entry.is_directory() {
                    // Duplicate directory records collapse into one entry
                    if !directories.insert(entry.segments.clone()) {
                        continue;
                    }
                }
                entries.push(entry);
            }
            Err(err) => {
                warn!(%err, "substituting placeholder entry");
                entries.push(ArchiveEntry::unknown(record, index));
            }
        }
    }

    let mut implied = Vec::new();
    for entry in &entries {
        for ancestor in entry.segments.ancestors() {
            if directories.insert(ancestor.clone()) {
                implied.push(ArchiveEntry::implicit_directory(ancestor));
            }
        }
    }
    if !implied.is_empty() {
        debug!(count = implied.len(), "added implied directories");
    }
    entries.extend(implied);

    entries
}
