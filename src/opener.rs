//! Hands extracted files to external applications.
//!
//! A file's extension picks a [`ContentCategory`], the category picks a
//! [`ViewerKind`], and [`dispatch`] walks the fallback chain: dedicated
//! viewer, then the generic open/share action, then a notice telling the
//! user where the file is.

use std::fmt;
use std::path::Path;
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::{NavError, NavResult};

/// Broad kind of content, inferred from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Image,
    /// Video or audio
    Media,
    Document,
    Other,
}

impl ContentCategory {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tif" | "tiff" | "heic" | "heif"
            | "svg" | "ico" => Self::Image,
            "mp4" | "m4v" | "mkv" | "avi" | "mov" | "webm" | "3gp" | "flv" | "wmv" | "mpg"
            | "mpeg" | "mp3" | "wav" | "ogg" | "oga" | "flac" | "aac" | "m4a" | "opus" | "wma" => {
                Self::Media
            }
            "pdf" | "doc" | "docx" | "odt" | "rtf" | "txt" | "md" | "xls" | "xlsx" | "ods"
            | "csv" | "ppt" | "pptx" | "odp" | "epub" | "html" | "htm" => Self::Document,
            _ => Self::Other,
        }
    }
}

/// Dedicated application types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKind {
    ImageViewer,
    MediaPlayer,
    DocumentViewer,
}

impl ViewerKind {
    pub fn for_category(category: ContentCategory) -> Option<Self> {
        match category {
            ContentCategory::Image => Some(Self::ImageViewer),
            ContentCategory::Media => Some(Self::MediaPlayer),
            ContentCategory::Document => Some(Self::DocumentViewer),
            ContentCategory::Other => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ImageViewer => "image viewer",
            Self::MediaPlayer => "media player",
            Self::DocumentViewer => "document viewer",
        }
    }
}

/// Something a file can be launched with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchTarget {
    Viewer(ViewerKind),
    /// The platform's generic open/share action
    Generic,
}

impl fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchTarget::Viewer(kind) => f.write_str(kind.label()),
            LaunchTarget::Generic => f.write_str("generic opener"),
        }
    }
}

/// How an open request was finally served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Viewer(ViewerKind),
    Generic,
    /// Nothing could open the file; the message is for the user
    Notice(String),
}

/// Launches files with external applications
pub trait Launcher: Send + Sync {
    /// Fails with [`NavError::ViewerUnavailable`] when nothing handles `target`
    fn launch(&self, target: LaunchTarget, path: &Path) -> NavResult<()>;
}

/// Open `path` with the best available application.
///
/// Launch failures are absorbed here; the worst result is a notice.
pub fn dispatch(launcher: &dyn Launcher, path: &Path) -> OpenOutcome {
    let category = ContentCategory::from_path(path);
    if let Some(kind) = ViewerKind::for_category(category) {
        match launcher.launch(LaunchTarget::Viewer(kind), path) {
            Ok(()) => return OpenOutcome::Viewer(kind),
            Err(err) => debug!(%err, "falling back to generic opener"),
        }
    }

    match launcher.launch(LaunchTarget::Generic, path) {
        Ok(()) => OpenOutcome::Generic,
        Err(err) => {
            warn!(%err, path = %path.display(), "no application could open file");
            OpenOutcome::Notice(format!("file already downloaded at {}", path.display()))
        }
    }
}

/// Commands for each launch target; `None` means not configured
#[derive(Debug, Clone, Default)]
pub struct LauncherConfig {
    pub image_viewer: Option<String>,
    pub media_player: Option<String>,
    pub document_viewer: Option<String>,
    /// Generic opener, the platform default when unset
    pub opener: Option<String>,
}

impl LauncherConfig {
    fn command_for(&self, target: LaunchTarget) -> Option<String> {
        match target {
            LaunchTarget::Viewer(ViewerKind::ImageViewer) => self.image_viewer.clone(),
            LaunchTarget::Viewer(ViewerKind::MediaPlayer) => self.media_player.clone(),
            LaunchTarget::Viewer(ViewerKind::DocumentViewer) => self.document_viewer.clone(),
            LaunchTarget::Generic => self.opener.clone().or_else(platform_opener),
        }
    }
}

fn platform_opener() -> Option<String> {
    if cfg!(target_os = "macos") {
        Some("open".to_string())
    } else if cfg!(windows) {
        Some("explorer".to_string())
    } else if cfg!(unix) {
        Some("xdg-open".to_string())
    } else {
        None
    }
}

/// Launches configured shell-style commands, passing the path last
pub struct CommandLauncher {
    config: LauncherConfig,
}

impl CommandLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }
}

impl Launcher for CommandLauncher {
    fn launch(&self, target: LaunchTarget, path: &Path) -> NavResult<()> {
        let unavailable = || NavError::ViewerUnavailable {
            target: target.to_string(),
        };
        let command = self.config.command_for(target).ok_or_else(unavailable)?;
        let mut words = command.split_whitespace();
        let program = words.next().ok_or_else(unavailable)?;

        debug!(%target, program, path = %path.display(), "launching");
        let mut command = Command::new(program);
        command
            .args(words)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        spawn_reaped(&mut command)
            .map(|_| ())
            .map_err(|err| {
                debug!(%err, program, "launch failed");
                unavailable()
            })
    }
}

/// Start `command` and wait for it on a detached thread, so the exited
/// child is reaped while zipnav keeps running
fn spawn_reaped(command: &mut Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = command.spawn()?;
    Ok(thread::spawn(move || child.wait()))
}

/// Reports what would be launched without starting anything
pub struct DryRunLauncher {
    config: LauncherConfig,
}

impl DryRunLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }
}

impl Launcher for DryRunLauncher {
    fn launch(&self, target: LaunchTarget, path: &Path) -> NavResult<()> {
        match self.config.command_for(target) {
            Some(command) => {
                eprintln!("would run: {} {}", command, path.display());
                Ok(())
            }
            None => Err(NavError::ViewerUnavailable {
                target: target.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Accepts only the listed targets and records every attempt
    struct FakeLauncher {
        accepts: Vec<LaunchTarget>,
        attempts: Mutex<Vec<LaunchTarget>>,
    }

    impl FakeLauncher {
        fn accepting(accepts: &[LaunchTarget]) -> Self {
            Self {
                accepts: accepts.to_vec(),
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    impl Launcher for FakeLauncher {
        fn launch(&self, target: LaunchTarget, _path: &Path) -> NavResult<()> {
            self.attempts.lock().unwrap().push(target);
            if self.accepts.contains(&target) {
                Ok(())
            } else {
                Err(NavError::ViewerUnavailable {
                    target: target.to_string(),
                })
            }
        }
    }

    #[test]
    fn categories_from_extension() {
        assert_eq!(ContentCategory::from_path(Path::new("a/IMG1.JPG")), ContentCategory::Image);
        assert_eq!(ContentCategory::from_path(Path::new("song.flac")), ContentCategory::Media);
        assert_eq!(ContentCategory::from_path(Path::new("clip.mp4")), ContentCategory::Media);
        assert_eq!(ContentCategory::from_path(Path::new("report.pdf")), ContentCategory::Document);
        assert_eq!(ContentCategory::from_path(Path::new("tool.bin")), ContentCategory::Other);
        assert_eq!(ContentCategory::from_path(Path::new("Makefile")), ContentCategory::Other);
    }

    #[test]
    fn dedicated_viewer_wins() {
        let launcher = FakeLauncher::accepting(&[
            LaunchTarget::Viewer(ViewerKind::ImageViewer),
            LaunchTarget::Generic,
        ]);
        let outcome = dispatch(&launcher, Path::new("/tmp/photos/img1.jpg"));
        assert_eq!(outcome, OpenOutcome::Viewer(ViewerKind::ImageViewer));
        assert_eq!(
            *launcher.attempts.lock().unwrap(),
            [LaunchTarget::Viewer(ViewerKind::ImageViewer)]
        );
    }

    #[test]
    fn falls_back_to_generic_then_notice() {
        let launcher = FakeLauncher::accepting(&[LaunchTarget::Generic]);
        assert_eq!(
            dispatch(&launcher, Path::new("/tmp/a.pdf")),
            OpenOutcome::Generic
        );

        let launcher = FakeLauncher::accepting(&[]);
        let outcome = dispatch(&launcher, Path::new("/tmp/a.pdf"));
        assert_eq!(
            outcome,
            OpenOutcome::Notice("file already downloaded at /tmp/a.pdf".to_string())
        );
        assert_eq!(
            *launcher.attempts.lock().unwrap(),
            [
                LaunchTarget::Viewer(ViewerKind::DocumentViewer),
                LaunchTarget::Generic
            ]
        );
    }

    #[test]
    fn other_content_skips_dedicated_viewers() {
        let launcher = FakeLauncher::accepting(&[LaunchTarget::Generic]);
        assert_eq!(
            dispatch(&launcher, Path::new("/tmp/data.bin")),
            OpenOutcome::Generic
        );
        assert_eq!(*launcher.attempts.lock().unwrap(), [LaunchTarget::Generic]);
    }

    #[test]
    fn unconfigured_viewer_is_unavailable() {
        let config = LauncherConfig {
            opener: Some("true".to_string()),
            ..Default::default()
        };
        let launcher = DryRunLauncher::new(config);
        assert!(matches!(
            launcher.launch(LaunchTarget::Viewer(ViewerKind::MediaPlayer), Path::new("x.mp3")),
            Err(NavError::ViewerUnavailable { .. })
        ));
        assert!(launcher.launch(LaunchTarget::Generic, Path::new("x.mp3")).is_ok());
    }

    #[test]
    fn missing_program_is_unavailable() {
        let config = LauncherConfig {
            image_viewer: Some("zipnav-no-such-viewer-binary --flag".to_string()),
            ..Default::default()
        };
        let launcher = CommandLauncher::new(config);
        assert!(matches!(
            launcher.launch(LaunchTarget::Viewer(ViewerKind::ImageViewer), Path::new("a.png")),
            Err(NavError::ViewerUnavailable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn launched_programs_are_reaped() {
        let mut command = Command::new("sh");
        command.args(["-c", "exit 3"]).stdin(Stdio::null());
        let waiter = spawn_reaped(&mut command).unwrap();

        // The waiting thread collects the exit status, so no zombie remains
        let status = waiter.join().unwrap().unwrap();
        assert_eq!(status.code(), Some(3));
    }
}
