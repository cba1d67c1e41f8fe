// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 tidywatch contributors

//! File system watcher for monitoring a single directory
//!
//! The watcher owns at most one OS-level watch at a time and forwards
//! qualifying file-creation events to a registered [`NotificationSink`].
//! Paths are delivered in absolute form; the watch root is canonicalized
//! when a session starts.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::{Result, TidywatchError};

/// Messages delivered to the sink
#[derive(Debug, Clone)]
pub enum Notification {
    /// A new file appeared in the watched directory
    FileAdded(PathBuf),
    /// The OS event source failed after a successful start; the session is over
    Interrupted(String),
}

/// Receiver of watcher notifications.
///
/// Delivery happens on the watch backend's own thread, so implementations
/// must hand off quickly (send on a channel, wake a task) rather than block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl NotificationSink for std::sync::mpsc::Sender<Notification> {
    fn notify(&self, notification: Notification) {
        let _ = self.send(notification);
    }
}

impl NotificationSink for tokio::sync::mpsc::UnboundedSender<Notification> {
    fn notify(&self, notification: Notification) {
        let _ = self.send(notification);
    }
}

type SharedSink = Arc<RwLock<Option<Arc<dyn NotificationSink>>>>;

/// One start-to-stop observation period.
///
/// Dropping the session releases the OS watch handle. The `live` flag is
/// shared with the event handler: once cleared, in-flight events are dropped,
/// so no notification for this session outlives `stop()`.
struct WatchSession {
    root: PathBuf,
    live: Arc<AtomicBool>,
    _watcher: RecommendedWatcher,
}

/// Directory watcher with replaceable sink and re-entrant restart semantics
pub struct FolderWatcher {
    sink: SharedSink,
    session: Option<WatchSession>,
}

impl FolderWatcher {
    /// Create an idle watcher with no sink attached
    pub fn new() -> Self {
        Self {
            sink: Arc::new(RwLock::new(None)),
            session: None,
        }
    }

    /// Register the notification destination, replacing any prior one.
    ///
    /// Does not start observation, and past notifications are not redelivered.
    pub fn attach_sink<S: NotificationSink + 'static>(&mut self, sink: S) {
        if let Ok(mut slot) = self.sink.write() {
            *slot = Some(Arc::new(sink));
        }
    }

    /// Begin observing `path` for new files.
    ///
    /// Any active session is stopped first, so at most one session is ever
    /// alive. Files already present when observation begins are not reported,
    /// and only direct children of `path` are considered. Fails with
    /// [`TidywatchError::InvalidWatchTarget`] when `path` is missing or not a
    /// directory, leaving the watcher idle.
    pub fn start(&mut self, path: &Path) -> Result<()> {
        self.stop();

        let root = path
            .canonicalize()
            .map_err(|_| TidywatchError::InvalidWatchTarget(path.to_path_buf()))?;
        if !root.is_dir() {
            return Err(TidywatchError::InvalidWatchTarget(path.to_path_buf()));
        }

        let live = Arc::new(AtomicBool::new(true));
        let handler = session_handler(root.clone(), Arc::clone(&live), Arc::clone(&self.sink));

        let mut watcher = RecommendedWatcher::new(handler, Config::default())?;
        if let Err(e) = watcher.watch(&root, RecursiveMode::NonRecursive) {
            // Registration failures (e.g. permissions) count as a bad target
            warn!("Failed to register watch on {:?}: {}", root, e);
            return Err(TidywatchError::InvalidWatchTarget(path.to_path_buf()));
        }
        info!("Watching: {:?}", root);

        self.session = Some(WatchSession {
            root,
            live,
            _watcher: watcher,
        });

        Ok(())
    }

    /// Release the active session, if any. Calling with no session is a no-op.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.live.store(false, Ordering::SeqCst);
            info!("Stopped watching: {:?}", session.root);
        }
    }

    /// True between a successful `start` and the matching `stop` or interruption
    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.live.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Root of the active session, if any
    pub fn watched_path(&self) -> Option<&Path> {
        self.session
            .as_ref()
            .filter(|s| s.live.load(Ordering::SeqCst))
            .map(|s| s.root.as_path())
    }
}

impl Default for FolderWatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the per-session event handler run on the notify backend thread
fn session_handler(
    root: PathBuf,
    live: Arc<AtomicBool>,
    sink: SharedSink,
) -> impl Fn(notify::Result<Event>) + Send + 'static {
    move |outcome| {
        if !live.load(Ordering::SeqCst) {
            return;
        }

        match outcome {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_)) {
                    return;
                }
                for path in event.paths {
                    if !qualifies(&root, &path) {
                        continue;
                    }
                    debug!("File appeared: {:?}", path);
                    deliver(&sink, Notification::FileAdded(path));
                }
            }
            Err(e) => {
                // The session is over; the owner decides whether to restart.
                live.store(false, Ordering::SeqCst);
                warn!("Watch interrupted: {}", e);
                deliver(&sink, Notification::Interrupted(e.to_string()));
            }
        }
    }
}

/// A created path qualifies when it is a visible file directly under the root
fn qualifies(root: &Path, path: &Path) -> bool {
    if path.parent() != Some(root) {
        return false;
    }

    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    if filename.starts_with('.') {
        return false;
    }

    path.is_file()
}

fn deliver(sink: &SharedSink, notification: Notification) {
    let registered = sink.read().ok().and_then(|slot| slot.clone());
    if let Some(sink) = registered {
        sink.notify(notification);
    }
}
