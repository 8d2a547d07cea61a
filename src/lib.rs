//! tidywatch - automatic sorting for a watched folder
//!
//! This library watches a directory for newly created files and relocates
//! each one into a destination folder chosen by a rule keyed on the file's
//! extension, with deterministic conflict resolution and a live-reloadable
//! rule table.

pub mod cli;
pub mod monitor;
pub mod placer;
pub mod reload;
pub mod report;
pub mod rules;
pub mod watcher;

pub use monitor::{Monitor, MonitorConfig, MonitorError, StopHandle};
pub use placer::{PlaceError, Placement, Placer};
pub use reload::ReloadWatcher;
pub use report::{ConsoleReporter, MemoryReporter, MonitorEvent, Report, SkipReason};
pub use rules::{RuleDocument, RuleError, RuleTable, Settings};
pub use watcher::{ArrivalEvent, EventWatcher, PollWatcher, Watch};

pub use cli::{Cli, run_cli};
