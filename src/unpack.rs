//! Lazy extraction: the whole archive is unpacked next to itself the first
//! time any entry is opened, and later opens reuse what is on disk.
//!
//! Disk layout:
//!
//! - loose archives unpack into `<dir>/<stem>/`
//! - single-folder archives unpack into `<dir>/`, so their folder lands
//!   at `<dir>/<folder>/`, unless `<dir>/<folder>` is the archive file
//!   itself; then they unpack into `<dir>/<stem>/` like loose archives
//!
//! The same functions decide where extraction writes and where an entry
//! is looked up afterwards, so the two cannot disagree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveEntry, ArchiveIndex, Layout};
use crate::error::{NavError, NavResult};
use crate::io::LocalFileReader;
use crate::zip::{ExtractSummary, ZipExtractor, ZipRecord};

/// Suffix for the destination of archives without an extension
const NO_EXTENSION_SUFFIX: &str = "_unzipped";

/// Directory extraction writes into
pub fn destination_dir(archive: &Path, layout: &Layout) -> PathBuf {
    let parent = archive.parent().unwrap_or_else(|| Path::new(""));
    match layout {
        // A wrapping folder named like the archive file would collide with it
        Layout::SingleFolder(folder) if parent.join(folder) != archive => parent.to_path_buf(),
        _ => parent.join(loose_folder_name(archive)),
    }
}

/// Directory whose presence means the archive was already extracted
pub fn content_root(archive: &Path, layout: &Layout) -> PathBuf {
    match layout {
        Layout::SingleFolder(folder) => destination_dir(archive, layout).join(folder),
        Layout::Loose => destination_dir(archive, layout),
    }
}

/// Where an entry lives once the archive is extracted
pub fn entry_disk_path(archive: &Path, layout: &Layout, entry: &ArchiveEntry) -> PathBuf {
    destination_dir(archive, layout).join(entry.segments().to_relative_path())
}

fn loose_folder_name(archive: &Path) -> String {
    let name = archive
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match archive.file_stem().map(|s| s.to_string_lossy().into_owned()) {
        Some(stem) if stem != name => stem,
        _ => format!("{}{}", name, NO_EXTENSION_SUFFIX),
    }
}

/// Busy indicator shown while an extraction runs
pub trait ProgressIndicator: Send + Sync {
    fn show(&self, archive: &Path);
    fn dismiss(&self);
}

/// Indicator that shows nothing
pub struct NoProgress;

impl ProgressIndicator for NoProgress {
    fn show(&self, _archive: &Path) {}
    fn dismiss(&self) {}
}

/// Dismisses the indicator when dropped, on every exit path
struct ProgressGuard(Arc<dyn ProgressIndicator>);

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.dismiss();
    }
}

/// Holds the single extraction slot until dropped
struct SlotGuard(Arc<AtomicBool>);

impl SlotGuard {
    fn claim(slot: &Arc<AtomicBool>) -> Option<Self> {
        slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SlotGuard(slot.clone()))
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An open request, possibly waiting on a background extraction
pub struct PendingOpen {
    path: PathBuf,
    archive: PathBuf,
    task: Option<JoinHandle<NavResult<ExtractSummary>>>,
}

impl PendingOpen {
    /// Absolute location the entry will have on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when this request started an extraction
    pub fn is_extracting(&self) -> bool {
        self.task.is_some()
    }

    /// Wait for the extraction, if any, and return the entry's path.
    ///
    /// Dropping the request instead lets the extraction finish unobserved.
    pub async fn wait(self) -> NavResult<PathBuf> {
        if let Some(task) = self.task {
            match task.await {
                Ok(result) => {
                    result?;
                }
                Err(join_err) => {
                    return Err(NavError::ExtractionFailed {
                        archive: self.archive,
                        reason: join_err.to_string(),
                    });
                }
            }
        }

        if !self.path.exists() {
            return Err(NavError::ExtractionFailed {
                archive: self.archive,
                reason: format!("{} is missing after extraction", self.path.display()),
            });
        }
        Ok(self.path)
    }
}

/// Extracts one archive at most once at a time
pub struct LazyExtractor {
    archive: PathBuf,
    layout: Layout,
    extractor: Arc<ZipExtractor<LocalFileReader>>,
    records: Arc<Vec<ZipRecord>>,
    targets: Arc<Vec<Option<PathBuf>>>,
    slot: Arc<AtomicBool>,
    progress: Arc<dyn ProgressIndicator>,
}

impl LazyExtractor {
    pub fn new(index: &ArchiveIndex, progress: Arc<dyn ProgressIndicator>) -> Self {
        let archive = std::path::absolute(index.path()).unwrap_or_else(|_| index.path().into());
        Self {
            archive,
            layout: index.layout().clone(),
            extractor: index.extractor().clone(),
            records: index.records().clone(),
            targets: Arc::new(index.record_targets()),
            slot: Arc::new(AtomicBool::new(false)),
            progress,
        }
    }

    pub fn destination(&self) -> PathBuf {
        destination_dir(&self.archive, &self.layout)
    }

    pub fn entry_path(&self, entry: &ArchiveEntry) -> PathBuf {
        entry_disk_path(&self.archive, &self.layout, entry)
    }

    pub fn is_extracted(&self) -> bool {
        content_root(&self.archive, &self.layout).is_dir()
    }

    pub fn is_busy(&self) -> bool {
        self.slot.load(Ordering::Acquire)
    }

    /// Start resolving `entry` to a file on disk.
    ///
    /// Resolves at once when the content root exists. Otherwise the whole
    /// archive is extracted on a tokio worker while the progress indicator
    /// is shown. A request made while another extraction runs is rejected
    /// with [`NavError::ExtractionInProgress`]. Must be called from within
    /// a tokio runtime.
    pub fn begin(&self, entry: &ArchiveEntry) -> NavResult<PendingOpen> {
        let path = self.entry_path(entry);
        let Some(slot) = SlotGuard::claim(&self.slot) else {
            warn!(archive = %self.archive.display(), "open rejected, extraction running");
            return Err(NavError::ExtractionInProgress);
        };

        if self.is_extracted() {
            debug!(path = %path.display(), "already extracted");
            return Ok(PendingOpen {
                path,
                archive: self.archive.clone(),
                task: None,
            });
        }

        let dest = self.destination();
        info!(
            archive = %self.archive.display(),
            dest = %dest.display(),
            "extracting archive"
        );
        self.progress.show(&self.archive);
        let progress = ProgressGuard(self.progress.clone());

        let archive = self.archive.clone();
        let extractor = self.extractor.clone();
        let records = self.records.clone();
        let targets = self.targets.clone();
        let task = tokio::spawn(async move {
            let _slot = slot;
            let _progress = progress;
            match extractor.extract_all(&records, &targets, &dest).await {
                Ok(summary) => {
                    info!(
                        archive = %archive.display(),
                        files = summary.files,
                        directories = summary.directories,
                        bytes = summary.bytes,
                        skipped = summary.skipped,
                        "extraction finished"
                    );
                    Ok(summary)
                }
                Err(err) => {
                    warn!(archive = %archive.display(), error = %format!("{:#}", err), "extraction failed");
                    Err(NavError::extraction(&archive, &err))
                }
            }
        });

        Ok(PendingOpen {
            path,
            archive: self.archive.clone(),
            task: Some(task),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_archive_unpacks_beside_itself() {
        let archive = Path::new("/data/photos.zip");
        assert_eq!(
            destination_dir(archive, &Layout::Loose),
            PathBuf::from("/data/photos")
        );
        assert_eq!(
            content_root(archive, &Layout::Loose),
            PathBuf::from("/data/photos")
        );
        let entry = ArchiveEntry::for_tests("img1.jpg");
        assert_eq!(
            entry_disk_path(archive, &Layout::Loose, &entry),
            PathBuf::from("/data/photos/img1.jpg")
        );
    }

    #[test]
    fn single_folder_archive_unpacks_into_parent() {
        let archive = Path::new("/data/notes.zip");
        let layout = Layout::SingleFolder("notes".to_string());
        assert_eq!(destination_dir(archive, &layout), PathBuf::from("/data"));
        assert_eq!(content_root(archive, &layout), PathBuf::from("/data/notes"));
        let entry = ArchiveEntry::for_tests("notes/sub/b.txt");
        assert_eq!(
            entry_disk_path(archive, &layout, &entry),
            PathBuf::from("/data/notes/sub/b.txt")
        );
    }

    #[test]
    fn archive_without_extension_gets_suffix() {
        assert_eq!(
            destination_dir(Path::new("/data/bundle"), &Layout::Loose),
            PathBuf::from("/data/bundle_unzipped")
        );
    }

    #[test]
    fn folder_named_like_archive_unpacks_beside_it() {
        let archive = Path::new("/data/bundle");
        let layout = Layout::SingleFolder("bundle".to_string());
        assert_eq!(
            destination_dir(archive, &layout),
            PathBuf::from("/data/bundle_unzipped")
        );
        assert_eq!(
            content_root(archive, &layout),
            PathBuf::from("/data/bundle_unzipped/bundle")
        );

        let archive = Path::new("/data/x.zip");
        let layout = Layout::SingleFolder("x.zip".to_string());
        let entry = ArchiveEntry::for_tests("x.zip/a.txt");
        assert_eq!(
            entry_disk_path(archive, &layout, &entry),
            PathBuf::from("/data/x/x.zip/a.txt")
        );
    }

    #[test]
    fn slot_is_single_and_released_on_drop() {
        let slot = Arc::new(AtomicBool::new(false));
        let first = SlotGuard::claim(&slot).unwrap();
        assert!(SlotGuard::claim(&slot).is_none());
        drop(first);
        assert!(SlotGuard::claim(&slot).is_some());
    }
}
