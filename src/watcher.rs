//! Arrival detection for the monitored directory.
//!
//! Two interchangeable strategies sit behind the [`Watch`] trait:
//! [`PollWatcher`] diffs successive directory listings on a fixed cadence,
//! and [`EventWatcher`] subscribes to platform file-system notifications.
//! Polling is the default; it needs no platform support and composes
//! directly with interval changes from a rules reload.
//!
//! Neither variant detects write-completion: a file still being written by
//! another process can surface before it is complete. Callers that need
//! write-in-progress safety must add their own settle delay.

use chrono::{DateTime, Utc};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// A newly detected regular file in the monitored directory.
#[derive(Debug, Clone)]
pub struct ArrivalEvent {
    /// Name of the file, without its directory.
    pub file_name: String,
    /// Directory the file appeared in.
    pub directory: PathBuf,
    /// When the watcher noticed the file.
    pub detected_at: DateTime<Utc>,
}

/// Capability to produce arrival events for a monitored directory.
///
/// `poll` never blocks waiting for arrivals; it returns whatever has been
/// detected since the previous call. The owner of the watcher drives the
/// cadence and checks its stop signal between calls.
pub trait Watch: Send {
    fn poll(&mut self) -> io::Result<Vec<ArrivalEvent>>;
}

/// Polling watcher: remembers the previous listing and reports the set
/// difference on each poll.
///
/// Only regular files are reported; directories and other entry kinds are
/// remembered (so they are not re-examined) but never yielded. Arrivals
/// within one poll are sorted by name so downstream collision handling is
/// deterministic.
pub struct PollWatcher {
    directory: PathBuf,
    seen: HashSet<String>,
}

impl PollWatcher {
    /// Start watching `directory`.
    ///
    /// Entries already present are recorded as seen; only files appearing
    /// after this call are reported.
    pub fn new(directory: impl Into<PathBuf>) -> io::Result<Self> {
        let directory = directory.into();
        let seen = list_names(&directory)?;
        Ok(Self { directory, seen })
    }
}

impl Watch for PollWatcher {
    fn poll(&mut self) -> io::Result<Vec<ArrivalEvent>> {
        let current = list_names(&self.directory)?;

        let mut fresh: Vec<&String> = current.difference(&self.seen).collect();
        fresh.sort();

        let mut arrivals = Vec::new();
        for name in fresh {
            if self.directory.join(name).is_file() {
                arrivals.push(ArrivalEvent {
                    file_name: name.clone(),
                    directory: self.directory.clone(),
                    detected_at: Utc::now(),
                });
            }
        }

        self.seen = current;
        Ok(arrivals)
    }
}

fn list_names(directory: &Path) -> io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Event-driven watcher backed by platform file-system notifications.
///
/// Creation events are delivered into a channel by the notify backend and
/// drained on each `poll`, so the variant plugs into the same single-loop
/// cadence as [`PollWatcher`].
pub struct EventWatcher {
    directory: PathBuf,
    events: mpsc::Receiver<notify::Result<notify::Event>>,
    /// Held to keep the platform subscription alive.
    _watcher: RecommendedWatcher,
}

impl EventWatcher {
    pub fn new(directory: impl Into<PathBuf>) -> notify::Result<Self> {
        let directory = directory.into();
        let (tx, rx) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(
            move |event: notify::Result<notify::Event>| {
                let _ = tx.send(event);
            },
        )?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        Ok(Self {
            directory,
            events: rx,
            _watcher: watcher,
        })
    }
}

impl Watch for EventWatcher {
    fn poll(&mut self) -> io::Result<Vec<ArrivalEvent>> {
        let mut arrivals = Vec::new();

        loop {
            match self.events.try_recv() {
                Ok(Ok(event)) => {
                    if !matches!(event.kind, EventKind::Create(_)) {
                        continue;
                    }
                    for path in event.paths {
                        // Directory creations are not arrivals.
                        if !path.is_file() {
                            continue;
                        }
                        let Some(name) = path.file_name() else {
                            continue;
                        };
                        arrivals.push(ArrivalEvent {
                            file_name: name.to_string_lossy().into_owned(),
                            directory: self.directory.clone(),
                            detected_at: Utc::now(),
                        });
                    }
                }
                Ok(Err(e)) => return Err(io::Error::other(e)),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    return Err(io::Error::other("file watcher channel disconnected"));
                }
            }
        }

        Ok(arrivals)
    }
}
