use std::fmt;
use std::path::PathBuf;

use crate::error::{NavError, NavResult};

/// Slash-separated archive path held as its segments.
///
/// The root is the empty path. Directory-ness is not part of the path;
/// `a/b/` and `a/b` parse to the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPath {
    segments: Vec<String>,
}

impl EntryPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse an entry name as stored in the archive.
    ///
    /// Rejects names that cannot be placed safely below a directory:
    /// empty or absolute names, drive prefixes, backslashes, NUL bytes,
    /// empty segments and `.`/`..` segments.
    pub fn parse(name: &str) -> NavResult<Self> {
        let malformed = || NavError::MalformedEntry {
            name: name.to_string(),
        };

        let trimmed = name.strip_suffix('/').unwrap_or(name);
        if trimmed.is_empty() || trimmed.starts_with('/') {
            return Err(malformed());
        }
        if trimmed.contains(['\\', '\0']) {
            return Err(malformed());
        }

        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || s == "." || s == "..")
        {
            return Err(malformed());
        }
        if is_drive_prefix(&segments[0]) {
            return Err(malformed());
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, `None` at the root
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<EntryPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, name: &str) -> EntryPath {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// True when `self` equals `prefix` or lies below it
    pub fn starts_with(&self, prefix: &EntryPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// True when `self` is exactly one level below `dir`
    pub fn is_child_of(&self, dir: &EntryPath) -> bool {
        self.len() == dir.len() + 1 && self.starts_with(dir)
    }

    /// All proper ancestors, nearest to the root first, root excluded
    pub fn ancestors(&self) -> impl Iterator<Item = EntryPath> + '_ {
        (1..self.segments.len()).map(|n| Self {
            segments: self.segments[..n].to_vec(),
        })
    }

    /// Relative filesystem path built from the segments
    pub fn to_relative_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
