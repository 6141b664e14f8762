use clap::Parser;

use crate::opener::LauncherConfig;

#[derive(Parser, Debug)]
#[command(name = "zipnav")]
#[command(version)]
#[command(about = "Browse a zip archive like a directory, extracting it on first open", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipnav photos.zip                 interactive shell (ls, cd, back, open, cat)\n  \
  zipnav -l -P sub notes.zip        list the contents of sub/\n  \
  zipnav -o img1.jpg photos.zip     extract photos.zip and open img1.jpg\n  \
  zipnav -p readme.txt docs.zip     print readme.txt without extracting")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Directory inside the archive to start in, relative to the top
    #[arg(short = 'P', value_name = "PATH")]
    pub path: Option<String>,

    /// List the current directory
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely and log more
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Open an entry of the current directory
    #[arg(short = 'o', value_name = "ENTRY")]
    pub open: Option<String>,

    /// Write an entry of the current directory to stdout
    #[arg(short = 'p', value_name = "ENTRY")]
    pub pipe: Option<String>,

    /// Show which application would open the file instead of launching it
    #[arg(short = 'n')]
    pub dry_run: bool,

    /// Command for images
    #[arg(long, value_name = "CMD")]
    pub image_viewer: Option<String>,

    /// Command for video and audio
    #[arg(long, value_name = "CMD")]
    pub media_player: Option<String>,

    /// Command for documents
    #[arg(long, value_name = "CMD")]
    pub document_viewer: Option<String>,

    /// Generic open/share command (platform default otherwise)
    #[arg(long, value_name = "CMD")]
    pub opener: Option<String>,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe.is_some()
    }

    pub fn is_interactive(&self) -> bool {
        !self.list && !self.verbose && self.open.is_none() && self.pipe.is_none()
    }

    /// Default log filter; `RUST_LOG` takes precedence
    pub fn log_level(&self) -> &'static str {
        match (self.verbose, self.quiet) {
            (_, q) if q > 1 => "error",
            (_, 1) => "warn",
            (true, _) => "debug",
            _ => "info",
        }
    }

    pub fn launcher_config(&self) -> LauncherConfig {
        LauncherConfig {
            image_viewer: self.image_viewer.clone(),
            media_player: self.media_player.clone(),
            document_viewer: self.document_viewer.clone(),
            opener: self.opener.clone(),
        }
    }
}
