//! The monitor: wires arrival detection to file placement.
//!
//! One loop on one thread: sleep, check the rules document for changes,
//! drain new arrivals, place each one in the order detected, report every
//! outcome. All steady-state errors are recoverable; the only fatal
//! condition is a missing monitored directory at startup.

use crate::placer::{Placement, Placer};
use crate::reload::ReloadWatcher;
use crate::report::{MonitorEvent, Report, SkipReason};
use crate::rules::RuleTable;
use crate::watcher::{ArrivalEvent, EventWatcher, PollWatcher, Watch};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Sleep applied after a failed directory listing, instead of the normal
/// poll interval.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Errors that can occur while setting up a monitor.
#[derive(Debug)]
pub enum MonitorError {
    /// The monitored directory does not exist.
    MissingDirectory(PathBuf),
    /// The arrival watcher could not be started.
    WatchFailed { path: PathBuf, reason: String },
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDirectory(path) => {
                write!(f, "Monitored folder not found: {}", path.display())
            }
            Self::WatchFailed { path, reason } => {
                write!(f, "Failed to watch {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for MonitorError {}

/// How a monitor is wired together.
///
/// The original system shipped several near-identical monitor scripts;
/// here the differences are configuration on one monitor instead.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory observed for new files.
    pub directory: PathBuf,
    /// Root that relative rule destinations are resolved against.
    pub dest_root: PathBuf,
    /// Path of the rules document, used for live reloading.
    pub rule_source: PathBuf,
    /// Use platform file-system events instead of polling.
    pub use_events: bool,
    /// Reload the rules document when it changes.
    pub reload: bool,
}

/// Cooperative stop signal for a running monitor.
///
/// `stop` is idempotent; the monitor observes the flag at the next cycle
/// boundary and returns from `run`. An in-flight move is never
/// interrupted.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct Monitor {
    directory: PathBuf,
    placer: Placer,
    rules: RuleTable,
    watcher: Box<dyn Watch>,
    reload: Option<ReloadWatcher>,
    reporter: Arc<dyn Report>,
    stop: Arc<AtomicBool>,
    backoff: bool,
}

impl Monitor {
    /// Build a monitor over an existing directory.
    ///
    /// The directory must exist at startup; it is not re-validated per
    /// cycle (a directory removed mid-run surfaces as a transient listing
    /// error instead).
    pub fn new(
        config: MonitorConfig,
        rules: RuleTable,
        reporter: Arc<dyn Report>,
    ) -> Result<Self, MonitorError> {
        if !config.directory.is_dir() {
            return Err(MonitorError::MissingDirectory(config.directory));
        }

        let watcher: Box<dyn Watch> = if config.use_events {
            Box::new(EventWatcher::new(&config.directory).map_err(|e| {
                MonitorError::WatchFailed {
                    path: config.directory.clone(),
                    reason: e.to_string(),
                }
            })?)
        } else {
            Box::new(PollWatcher::new(&config.directory).map_err(|e| {
                MonitorError::WatchFailed {
                    path: config.directory.clone(),
                    reason: e.to_string(),
                }
            })?)
        };

        let reload = config.reload.then(|| ReloadWatcher::new(&config.rule_source));

        Ok(Self {
            directory: config.directory,
            placer: Placer::new(config.dest_root),
            rules,
            watcher,
            reload,
            reporter,
            stop: Arc::new(AtomicBool::new(false)),
            backoff: false,
        })
    }

    /// Handle for stopping the monitor from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Run until stopped.
    ///
    /// Returning is the quiescent state: no cycle is in progress and no
    /// move is in flight once `run` returns.
    pub fn run(&mut self) {
        self.reporter.event(&MonitorEvent::Started {
            directory: self.directory.clone(),
            rule_count: self.rules.rule_count(),
            interval: self.poll_interval(),
        });

        while !self.stop.load(Ordering::Relaxed) {
            let interval = if self.backoff {
                ERROR_BACKOFF
            } else {
                self.poll_interval()
            };
            thread::sleep(interval);

            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            self.run_once();
        }

        self.reporter.event(&MonitorEvent::Stopped);
    }

    /// Execute a single monitor cycle without sleeping.
    ///
    /// Exposed for wrappers that drive their own schedule (service
    /// managers, tests): reload check, drain arrivals, place each one.
    pub fn run_once(&mut self) {
        if let Some(reload) = &mut self.reload {
            match reload.check(&mut self.rules) {
                Some(Ok(rule_count)) => {
                    self.reporter.event(&MonitorEvent::RulesReloaded { rule_count });
                }
                Some(Err(e)) => {
                    self.reporter.event(&MonitorEvent::ReloadFailed {
                        reason: e.to_string(),
                    });
                }
                None => {}
            }
        }

        match self.watcher.poll() {
            Ok(arrivals) => {
                self.backoff = false;
                for arrival in arrivals {
                    self.place(arrival);
                }
            }
            Err(e) => {
                self.backoff = true;
                self.reporter.event(&MonitorEvent::ListingFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn place(&self, arrival: ArrivalEvent) {
        self.reporter.event(&MonitorEvent::Arrival {
            file_name: arrival.file_name.clone(),
        });

        match self
            .placer
            .place(&arrival.directory, &arrival.file_name, &self.rules)
        {
            Ok(Placement::Moved { destination }) => {
                self.reporter.event(&MonitorEvent::Moved {
                    file_name: arrival.file_name,
                    destination,
                });
            }
            Ok(Placement::SkippedNoExtension) => {
                self.reporter.event(&MonitorEvent::Skipped {
                    file_name: arrival.file_name,
                    reason: SkipReason::NoExtension,
                });
            }
            Ok(Placement::SourceVanished) => {
                self.reporter.event(&MonitorEvent::Skipped {
                    file_name: arrival.file_name,
                    reason: SkipReason::SourceVanished,
                });
            }
            Err(e) => {
                self.reporter.event(&MonitorEvent::PlacementFailed {
                    file_name: arrival.file_name,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn poll_interval(&self) -> Duration {
        // A zero interval would spin; clamp to one second.
        Duration::from_secs(self.rules.settings().check_interval_seconds.max(1))
    }
}
