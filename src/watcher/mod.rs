//! Debounced watching of the flow-step file.
//!
//! Uses the notify crate for cross-platform file system events. Events
//! are drained on each poll; a reload is reported only after the file
//! has been quiet for the debounce interval, so editors that save in
//! several writes trigger one reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Quiet period required before a change is reported.
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches one flow-step file and reports debounced changes.
pub struct StepWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    step_path: PathBuf,
    step_name: Option<OsString>,
    debounce: Duration,
    pending_since: Option<Instant>,
}

impl StepWatcher {
    /// Create a watcher for the flow-step file at `path`.
    ///
    /// # Errors
    /// Returns an error if the watcher cannot be created or the parent
    /// directory cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Canonicalize so event paths from the OS (absolute and
        // canonical) compare equal to the stored path.
        let step_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let step_name = step_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&step_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        // Watch the directory, not the file: atomic saves replace the
        // inode and a file-level watch would go stale after one save.
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            step_path,
            step_name,
            debounce,
            pending_since: None,
        })
    }

    /// The canonical path of the watched flow-step file.
    pub fn step_path(&self) -> &Path {
        &self.step_path
    }

    /// Drain pending events; true once a debounced change is ready.
    pub fn take_change_ready(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(ev) if self.is_relevant(&ev) => changed = true,
                Ok(ev) => {
                    crate::perf::log_event(
                        "watch.skip",
                        format!("kind={:?} paths={:?}", ev.kind, ev.paths),
                    );
                }
                Err(err) => crate::perf::log_event("watch.error", format!("{err}")),
            }
        }

        if changed {
            crate::perf::log_event("watch.change", self.step_path.display().to_string());
            self.pending_since = Some(Instant::now());
        }

        let Some(pending_since) = self.pending_since else {
            return false;
        };
        if pending_since.elapsed() >= self.debounce {
            self.pending_since = None;
            return true;
        }
        false
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            if path == &self.watch_root || path == &self.step_path {
                return true;
            }
            // Backends that report only a file name (or a temp-rename
            // sibling) still match on the final component.
            self.step_name
                .as_ref()
                .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use tempfile::tempdir;

    #[test]
    fn test_directory_level_event_is_relevant_for_watched_file() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("step.json");
        std::fs::write(&path, "{}").expect("write");
        let watcher = StepWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        // Directory-level path, as macOS FSEvents reports
        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir],
            attrs: notify::event::EventAttributes::new(),
        };

        assert!(
            watcher.is_relevant(&event),
            "directory-level events should count as relevant"
        );
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        let root = watch_root_for(Path::new("step.json"));
        assert_eq!(root, PathBuf::from("."));
    }

    #[test]
    fn test_canonical_event_path_matches_relative_watcher() {
        let dir = tempdir().expect("tempdir");
        let relative_path = dir.path().join("step.json");
        std::fs::write(&relative_path, "{}").expect("write");
        let watcher =
            StepWatcher::new(&relative_path, Duration::from_millis(10)).expect("watcher");

        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir],
            attrs: notify::event::EventAttributes::new(),
        };

        assert!(
            watcher.is_relevant(&event),
            "canonical event paths should match a watcher created with a relative path"
        );
    }

    /// Same debounce and poll cadence as the real event loop.
    #[test]
    fn test_real_modification_with_app_timing() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("step.json");
        std::fs::write(&path, r#"{"title":"t","instruction":"a"}"#).expect("write");

        let mut watcher = StepWatcher::new(&path, RELOAD_DEBOUNCE).expect("watcher");

        // Give FSEvents time to register the watch
        std::thread::sleep(Duration::from_millis(500));

        std::fs::write(&path, r#"{"title":"t","instruction":"b"}"#).expect("write");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut detected = false;
        while Instant::now() < deadline {
            if watcher.take_change_ready() {
                detected = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(250));
        }

        assert!(
            detected,
            "watcher should detect an external rewrite within 5 seconds"
        );
    }
}
