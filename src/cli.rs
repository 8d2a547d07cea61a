//! Command-line front-end.
//!
//! Resolves the monitored directory (the user's Downloads folder by
//! default) and the rules document, prints the active rules, and runs the
//! monitor. Process supervision (services, init systems) is expected to
//! wrap this or drive [`Monitor`](crate::monitor::Monitor) directly.

use crate::monitor::{Monitor, MonitorConfig};
use crate::report::ConsoleReporter;
use crate::rules::{self, RuleTable};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "tidywatch",
    version,
    about = "Watch a folder and sort new files into place by extension"
)]
pub struct Cli {
    /// Directory to watch. Defaults to the user's Downloads folder.
    pub directory: Option<PathBuf>,

    /// Rules file to use. Defaults to ./file_rules.json, then the user
    /// config directory.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the active organization rules and exit.
    #[arg(long)]
    pub rules: bool,

    /// Use platform file-system events instead of polling.
    #[arg(long)]
    pub events: bool,

    /// Disable live reloading of the rules file.
    #[arg(long)]
    pub no_reload: bool,
}

/// Run the CLI application.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use tidywatch::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["tidywatch", "--rules"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> Result<(), String> {
    let home = dirs::home_dir().ok_or("could not determine the home directory")?;
    let directory = cli.directory.unwrap_or_else(|| home.join("Downloads"));
    let source = rules::resolve_source(cli.config.as_deref());

    let table = match RuleTable::load(&source) {
        Ok(table) => table,
        Err(e) => {
            eprintln!(
                "{} Could not load rules from {}: {}",
                "⚠".yellow(),
                source.display(),
                e
            );
            eprintln!("Using built-in default rules.");
            RuleTable::default()
        }
    };

    print_rules(&table);

    if cli.rules {
        return Ok(());
    }

    let config = MonitorConfig {
        directory,
        dest_root: home,
        rule_source: source,
        use_events: cli.events,
        reload: !cli.no_reload,
    };

    let mut monitor =
        Monitor::new(config, table, Arc::new(ConsoleReporter)).map_err(|e| e.to_string())?;
    monitor.run();

    Ok(())
}

/// Print the rule table grouped by destination folder.
pub fn print_rules(table: &RuleTable) {
    println!("{}", "File organization rules:".bold());
    for (folder, extensions) in table.rules_by_folder() {
        println!("  {}", folder.cyan());
        println!("    {}", extensions.join(", "));
    }
    println!("  {}", table.default_folder().cyan());
    println!("    all other file types");
}
