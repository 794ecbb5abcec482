//! Narrow interfaces to the host environment.
//!
//! The pipeline never presents UI itself. It hands a finished archive to a
//! [`ShareTarget`], surfaces non-fatal export failures through a
//! [`Notifier`], and obtains import input from a [`FilePicker`]. Closures
//! implement the first two directly.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Presents a finished archive to the user (save, send, ...).
pub trait ShareTarget: Send + Sync {
    /// Hands over the archive. Fire-and-forget.
    fn share(&self, archive: &Path);
}

impl<F> ShareTarget for F
where
    F: Fn(&Path) + Send + Sync,
{
    fn share(&self, archive: &Path) {
        self(archive);
    }
}

/// Surfaces a human-readable, non-fatal failure message.
pub trait Notifier: Send + Sync {
    /// Delivers the message. Fire-and-forget.
    fn notify(&self, message: &str);
}

impl<F> Notifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, message: &str) {
        self(message);
    }
}

/// Lets the user choose an input resource.
pub trait FilePicker {
    /// Opens the chosen resource, or returns `None` if the user cancelled.
    fn pick(&mut self, mime_hint: &str) -> Option<Box<dyn Read>>;
}

/// Leaves the archive where the exporter wrote it and logs its location.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepInPlace;

impl ShareTarget for KeepInPlace {
    fn share(&self, archive: &Path) {
        tracing::info!(archive = %archive.display(), "Archive ready");
    }
}

/// Copies the archive into a destination directory.
#[derive(Debug, Clone)]
pub struct CopyToDirectory {
    dir: PathBuf,
}

impl CopyToDirectory {
    /// Creates a share target that copies into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ShareTarget for CopyToDirectory {
    fn share(&self, archive: &Path) {
        let Some(name) = archive.file_name() else {
            tracing::warn!(archive = %archive.display(), "Archive path has no file name");
            return;
        };
        let dest = self.dir.join(name);
        let copied = fs::create_dir_all(&self.dir).and_then(|()| fs::copy(archive, &dest));
        match copied {
            Ok(bytes) => tracing::info!(dest = %dest.display(), bytes, "Archive copied"),
            Err(e) => tracing::warn!(dest = %dest.display(), error = %e, "Archive copy failed"),
        }
    }
}

/// Logs notifications at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(notification = message, "Export notification");
    }
}

/// Picks a fixed path, or nothing.
///
/// An unreadable path is treated like a cancelled pick.
#[derive(Debug, Clone, Default)]
pub struct PathPicker {
    path: Option<PathBuf>,
}

impl PathPicker {
    /// Picks `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Simulates a cancelled pick.
    #[must_use]
    pub const fn cancelled() -> Self {
        Self { path: None }
    }
}

impl FilePicker for PathPicker {
    fn pick(&mut self, mime_hint: &str) -> Option<Box<dyn Read>> {
        let path = self.path.take()?;
        match File::open(&path) {
            Ok(file) => {
                tracing::debug!(path = %path.display(), mime_hint, "Picked input");
                Some(Box::new(file))
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Picked input unreadable");
                None
            },
        }
    }
}
