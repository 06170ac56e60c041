//! Recursive file watching with per-path debouncing for `kiln watch`.

use crate::error::{CliError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Directory names whose contents never trigger a rebuild.
const IGNORED_DIRECTORIES: &[&str] = &["node_modules", "dist"];

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches a set of directories and reports changed files on a channel.
///
/// Dropping the watcher stops it and closes the channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl FileWatcher {
    /// Watch every directory in `roots` recursively.
    pub fn new(
        roots: Vec<PathBuf>,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<PathBuf>)> {
        if let Some(missing) = roots.iter().find(|root| !root.exists()) {
            return Err(CliError::FileNotFound(missing.clone()));
        }

        let (tx, rx) = mpsc::channel(100);
        let filter_roots = roots.clone();
        let mut last_seen: HashMap<PathBuf, Instant> = HashMap::new();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("file watcher error: {e}");
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }

            for path in event.paths {
                if should_ignore(&path, &filter_roots) {
                    continue;
                }

                let now = Instant::now();
                let recent = last_seen
                    .get(&path)
                    .is_some_and(|last| now.duration_since(*last) < debounce);
                if recent {
                    continue;
                }
                last_seen.insert(path.clone(), now);

                // Receiver gone means the watch loop ended.
                if tx.blocking_send(path).is_err() {
                    return;
                }
            }
        })?;

        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }

        Ok((
            Self {
                _watcher: watcher,
                roots,
            },
            rx,
        ))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Whether a change to `path` should be ignored.
///
/// Paths outside every root are ignored, as are paths under `node_modules`,
/// `dist` or any dot-directory, and dotfiles.
pub(crate) fn should_ignore(path: &Path, roots: &[PathBuf]) -> bool {
    let Some(relative) = roots
        .iter()
        .filter_map(|root| path.strip_prefix(root).ok())
        .min_by_key(|rel| rel.components().count())
    else {
        return true;
    };

    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || IGNORED_DIRECTORIES.contains(&name.as_ref())
        }
        _ => false,
    })
}
