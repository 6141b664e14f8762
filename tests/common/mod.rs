#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use zipnav::{LaunchTarget, Launcher, NavError, NavResult, ProgressIndicator};

pub enum Item<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
    Stored(&'a str, &'a [u8]),
}

pub fn write_zip(path: &Path, items: &[Item]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for item in items {
        match item {
            Item::Dir(name) => zip.add_directory(*name, deflated).unwrap(),
            Item::File(name, data) => {
                zip.start_file(*name, deflated).unwrap();
                zip.write_all(data).unwrap();
            }
            Item::Stored(name, data) => {
                zip.start_file(*name, stored).unwrap();
                zip.write_all(data).unwrap();
            }
        }
    }
    zip.finish().unwrap();
}

/// `photos.zip` with two loose images
pub fn photos_zip(dir: &Path) -> PathBuf {
    let path = dir.join("photos.zip");
    write_zip(
        &path,
        &[
            Item::File("img1.jpg", b"first image bytes"),
            Item::File("img2.jpg", b"second image bytes"),
        ],
    );
    path
}

/// `notes.zip` wrapping everything in `notes/`, directories listed
pub fn notes_zip(dir: &Path) -> PathBuf {
    let path = dir.join("notes.zip");
    write_zip(
        &path,
        &[
            Item::Dir("notes/"),
            Item::File("notes/a.txt", b"note a"),
            Item::Dir("notes/sub/"),
            Item::File("notes/sub/b.txt", b"note b"),
        ],
    );
    path
}

pub fn names(entries: &[zipnav::ArchiveEntry]) -> Vec<String> {
    entries.iter().map(|e| e.name()).collect()
}

/// Counts show/dismiss calls
#[derive(Default)]
pub struct CountingProgress {
    pub shown: AtomicUsize,
    pub dismissed: AtomicUsize,
}

impl CountingProgress {
    pub fn counts(&self) -> (usize, usize) {
        (
            self.shown.load(Ordering::SeqCst),
            self.dismissed.load(Ordering::SeqCst),
        )
    }
}

impl ProgressIndicator for CountingProgress {
    fn show(&self, _archive: &Path) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn dismiss(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Accepts the listed targets and records what was launched
pub struct RecordingLauncher {
    accepts: Vec<LaunchTarget>,
    pub launched: Mutex<Vec<(LaunchTarget, PathBuf)>>,
}

impl RecordingLauncher {
    pub fn accepting(accepts: &[LaunchTarget]) -> Self {
        Self {
            accepts: accepts.to_vec(),
            launched: Mutex::new(Vec::new()),
        }
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, target: LaunchTarget, path: &Path) -> NavResult<()> {
        if !self.accepts.contains(&target) {
            return Err(NavError::ViewerUnavailable {
                target: target.to_string(),
            });
        }
        self.launched
            .lock()
            .unwrap()
            .push((target, path.to_path_buf()));
        Ok(())
    }
}
