//! Monitor outcome reporting.
//!
//! Every observable outcome of the monitor flows through the [`Report`]
//! trait as a structured [`MonitorEvent`], so wrappers can render the
//! stream however they like: [`ConsoleReporter`] prints styled console
//! output, [`MemoryReporter`] buffers events for status displays and
//! tests.

use colored::*;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Why a file was skipped rather than moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The file name carries no extension.
    NoExtension,
    /// The file disappeared before it could be moved.
    SourceVanished,
}

/// A structured outcome emitted by the monitor.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Monitoring started on `directory`.
    Started {
        directory: PathBuf,
        rule_count: usize,
        interval: Duration,
    },
    /// A new file was detected.
    Arrival { file_name: String },
    /// A file was relocated to its destination.
    Moved {
        file_name: String,
        destination: PathBuf,
    },
    /// A file was deliberately left alone.
    Skipped {
        file_name: String,
        reason: SkipReason,
    },
    /// Placing a file failed; the file stays where it is.
    PlacementFailed { file_name: String, reason: String },
    /// The rules document changed and was reloaded.
    RulesReloaded { rule_count: usize },
    /// Reloading the rules document failed; prior rules stay in force.
    ReloadFailed { reason: String },
    /// Listing the monitored directory failed; retried after a backoff.
    ListingFailed { reason: String },
    /// Monitoring stopped.
    Stopped,
}

/// The single reporting channel of the monitor.
pub trait Report: Send + Sync {
    fn event(&self, event: &MonitorEvent);
}

/// Renders monitor events as styled console output.
pub struct ConsoleReporter;

impl Report for ConsoleReporter {
    fn event(&self, event: &MonitorEvent) {
        match event {
            MonitorEvent::Started {
                directory,
                rule_count,
                interval,
            } => {
                println!(
                    "{}",
                    format!(
                        "Monitoring {} ({} rules, checking every {}s). Press Ctrl+C to stop.",
                        directory.display(),
                        rule_count,
                        interval.as_secs()
                    )
                    .cyan()
                );
            }
            MonitorEvent::Arrival { file_name } => {
                println!("New file detected: {}", file_name.bold());
            }
            MonitorEvent::Moved {
                file_name,
                destination,
            } => {
                println!(
                    "  {} {} moved to {}",
                    "✓".green(),
                    file_name,
                    destination.display()
                );
            }
            MonitorEvent::Skipped { file_name, reason } => match reason {
                SkipReason::NoExtension => {
                    println!("  {} skipping {} (no extension)", "⚠".yellow(), file_name);
                }
                SkipReason::SourceVanished => {
                    println!(
                        "  {} {} vanished before it could be moved",
                        "⚠".yellow(),
                        file_name
                    );
                }
            },
            MonitorEvent::PlacementFailed { file_name, reason } => {
                eprintln!("  {} {}: {}", "✗".red(), file_name, reason);
            }
            MonitorEvent::RulesReloaded { rule_count } => {
                println!(
                    "{}",
                    format!("Rules reloaded ({} rules)", rule_count).cyan()
                );
            }
            MonitorEvent::ReloadFailed { reason } => {
                eprintln!("{} Rule reload failed: {}", "✗".red(), reason);
            }
            MonitorEvent::ListingFailed { reason } => {
                eprintln!("{} Error checking folder: {}", "✗".red(), reason);
            }
            MonitorEvent::Stopped => {
                println!("File monitoring stopped.");
            }
        }
    }
}

/// Buffers monitor events in memory.
///
/// Useful for wrappers that surface status through something other than
/// a console (a GUI status field, a service log) and for tests.
#[derive(Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<MonitorEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events reported so far.
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().expect("reporter lock poisoned").clone()
    }
}

impl Report for MemoryReporter {
    fn event(&self, event: &MonitorEvent) {
        self.events
            .lock()
            .expect("reporter lock poisoned")
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_records_in_order() {
        let reporter = MemoryReporter::new();
        reporter.event(&MonitorEvent::Arrival {
            file_name: "a.pdf".to_string(),
        });
        reporter.event(&MonitorEvent::Moved {
            file_name: "a.pdf".to_string(),
            destination: PathBuf::from("/home/user/Documents/a.pdf"),
        });

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], MonitorEvent::Arrival { file_name } if file_name == "a.pdf"));
        assert!(matches!(&events[1], MonitorEvent::Moved { .. }));
    }
}
