//! File watching for automatic rebuilds.
//!
//! Uses `notify-debouncer-full` to watch the source directory, the active
//! theme and the config file for changes.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};

use super::paths::is_hidden;
use crate::config::WatchConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Watch events
// =============================================================================

/// What kind of input changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A file under the source directory.
    Content(PathBuf),
    /// A layout or asset of the active theme.
    Theme(PathBuf),
    /// The config file itself.
    Config,
}

/// Events sent from the file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// Files changed, rebuild needed.
    FilesChanged(Vec<ChangeKind>),
    /// Watcher error occurred.
    Error(String),
}

// =============================================================================
// Path classification
// =============================================================================

/// Paths to watch for changes.
#[derive(Debug, Clone)]
pub struct WatchPaths {
    pub source_dir: PathBuf,
    pub theme_dir: PathBuf,
    pub config_path: PathBuf,
}

/// Classifies file paths into change types.
#[derive(Clone)]
pub struct PathClassifier {
    paths: WatchPaths,
}

impl PathClassifier {
    pub fn new(paths: WatchPaths) -> Self {
        Self { paths }
    }

    /// Classify a changed path; `None` for paths that cannot affect the build.
    pub fn classify(&self, path: &Path) -> Option<ChangeKind> {
        if path == self.paths.config_path {
            return Some(ChangeKind::Config);
        }

        if let Ok(relative) = path.strip_prefix(&self.paths.theme_dir) {
            return (!is_hidden(relative)).then(|| ChangeKind::Theme(path.to_path_buf()));
        }

        if let Ok(relative) = path.strip_prefix(&self.paths.source_dir) {
            return (!is_hidden(relative)).then(|| ChangeKind::Content(path.to_path_buf()));
        }

        None
    }
}

// =============================================================================
// File watcher
// =============================================================================

/// A file watcher that can use either native or polling backend.
pub enum FileWatcher {
    /// Native file system watcher (recommended for local development).
    Native {
        _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
    /// Polling-based watcher (for network filesystems, Docker, etc.).
    Polling {
        _debouncer: Debouncer<PollWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
}

impl FileWatcher {
    /// Create a new file watcher.
    pub fn new(config: &WatchConfig, paths: &WatchPaths) -> Result<Self, WatchError> {
        let debounce_timeout = Duration::from_millis(config.debounce_ms);
        let (tx, rx) = mpsc::channel();

        let classifier = PathClassifier::new(paths.clone());
        let callback = move |result: DebounceEventResult| match result {
            Ok(events) => {
                let changes: Vec<ChangeKind> = events
                    .iter()
                    .filter(|event| is_relevant_event(&event.kind))
                    .flat_map(|event| event.paths.iter())
                    .filter_map(|p| classifier.classify(p))
                    .collect();

                if !changes.is_empty() {
                    let _ = tx.send(WatchEvent::FilesChanged(changes));
                }
            }
            Err(errors) => {
                for e in errors {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            }
        };

        if config.poll {
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let notify_config = NotifyConfig::default().with_poll_interval(poll_interval);

            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                debounce_timeout,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )?;
            add_watch_paths(&mut debouncer, paths)?;

            Ok(FileWatcher::Polling {
                _debouncer: debouncer,
                rx,
            })
        } else {
            let mut debouncer = new_debouncer(debounce_timeout, None, callback)?;
            add_watch_paths(&mut debouncer, paths)?;

            Ok(FileWatcher::Native {
                _debouncer: debouncer,
                rx,
            })
        }
    }

    fn rx(&self) -> &Receiver<WatchEvent> {
        match self {
            FileWatcher::Native { rx, .. } => rx,
            FileWatcher::Polling { rx, .. } => rx,
        }
    }

    /// Receive the next watch event (blocking).
    pub fn recv(&self) -> Option<WatchEvent> {
        self.rx().recv().ok()
    }

    /// Take every event that is already queued, without blocking.
    pub fn drain(&self) -> Vec<WatchEvent> {
        std::iter::from_fn(|| self.rx().try_recv().ok()).collect()
    }
}

fn add_watch_paths<W: Watcher, C: notify_debouncer_full::FileIdCache>(
    debouncer: &mut Debouncer<W, C>,
    paths: &WatchPaths,
) -> Result<(), WatchError> {
    if paths.source_dir.exists() {
        debouncer.watch(&paths.source_dir, RecursiveMode::Recursive)?;
    }

    if paths.theme_dir.exists() {
        debouncer.watch(&paths.theme_dir, RecursiveMode::Recursive)?;
    }

    // The config file may be replaced rather than edited, so watch its directory
    if let Some(parent) = paths.config_path.parent()
        && parent.exists()
    {
        debouncer.watch(parent, RecursiveMode::NonRecursive)?;
    }

    Ok(())
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        PathClassifier::new(WatchPaths {
            source_dir: PathBuf::from("/site/source"),
            theme_dir: PathBuf::from("/site/themes/default"),
            config_path: PathBuf::from("/site/folio.yaml"),
        })
    }

    #[test]
    fn test_classify() {
        let c = classifier();
        assert_eq!(c.classify(Path::new("/site/folio.yaml")), Some(ChangeKind::Config));
        assert_eq!(
            c.classify(Path::new("/site/source/posts/a.md")),
            Some(ChangeKind::Content(PathBuf::from("/site/source/posts/a.md")))
        );
        assert_eq!(
            c.classify(Path::new("/site/themes/default/layouts/post.html")),
            Some(ChangeKind::Theme(PathBuf::from(
                "/site/themes/default/layouts/post.html"
            )))
        );
    }

    #[test]
    fn test_ignored_paths() {
        let c = classifier();
        assert_eq!(c.classify(Path::new("/site/source/.a.md.swp")), None);
        assert_eq!(c.classify(Path::new("/site/source/.git/HEAD")), None);
        assert_eq!(c.classify(Path::new("/site/.public.staging/index.html")), None);
        assert_eq!(c.classify(Path::new("/site/public/index.html")), None);
        assert_eq!(c.classify(Path::new("/site/themes/other/layouts/a.html")), None);
    }
}
