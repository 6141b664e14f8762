//! # zipnav
//!
//! Browse a zip archive as if it were a directory tree, and extract it
//! only when a file inside is opened.
//!
//! Listing reads nothing but the central directory. The first time any
//! file is opened, the whole archive is extracted next to itself in the
//! background (see [`unpack`]); later opens find the extracted tree and
//! skip straight to launching a viewer chosen by content type (see
//! [`opener`]).
//!
//! ## Features
//!
//! - Single-folder archives (everything under one top-level folder) open
//!   inside that folder
//! - Unparseable entry names show up as an `unknown` placeholder instead
//!   of failing the listing
//! - STORED and DEFLATE entries, ZIP64 archives, CRC-32 verification
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use zipnav::{Activation, CommandLauncher, LauncherConfig, Navigator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut nav = Navigator::open(Path::new("notes.zip")).await?;
//!     for entry in nav.visible() {
//!         println!("{}", entry.name());
//!     }
//!
//!     if let Some(pos) = nav.position_of("a.txt") {
//!         if let Activation::File(_) = nav.enter(pos)? {
//!             let launcher = CommandLauncher::new(LauncherConfig::default());
//!             let (path, outcome) = nav.open_entry(pos, &launcher).await?;
//!             println!("{} -> {:?}", path.display(), outcome);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod io;
pub mod nav;
pub mod navigator;
pub mod opener;
pub mod unpack;
pub mod zip;

pub use archive::{ArchiveEntry, ArchiveIndex, Layout};
pub use cli::Cli;
pub use error::{NavError, NavResult};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use nav::{BASE_DEPTH, NavigationState};
pub use navigator::{Activation, BackOutcome, Navigator};
pub use opener::{
    CommandLauncher, ContentCategory, DryRunLauncher, LaunchTarget, Launcher, LauncherConfig,
    OpenOutcome, ViewerKind,
};
pub use unpack::{LazyExtractor, NoProgress, PendingOpen, ProgressIndicator};
pub use zip::{ZipExtractor, ZipRecord};
