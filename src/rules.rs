//! Rule table: the extension→destination mapping and monitor settings.
//!
//! Rules live in a JSON document (`file_rules.json`) that is shared with
//! any rule-editing front-end. Extensions are grouped for readability;
//! the grouping is cosmetic and is flattened before use. Group names
//! beginning with `_` are reserved for comments and ignored.
//!
//! # Document Format
//!
//! ```json
//! {
//!   "file_extensions": {
//!     "documents": { ".pdf": "Documents", ".docx": "Documents" },
//!     "archives": { ".zip": "Downloads/Archives" },
//!     "_comment": "group names are cosmetic"
//!   },
//!   "settings": {
//!     "default_folder": "Downloads/Others",
//!     "check_interval_seconds": 1,
//!     "handle_duplicates": true,
//!     "create_folders": true,
//!     "case_sensitive": false
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// File name the rules document is looked up under.
pub const RULES_FILE_NAME: &str = "file_rules.json";

/// Errors that can occur while loading or reloading the rules document.
#[derive(Debug, Clone)]
pub enum RuleError {
    /// Rules document not found at the specified path.
    NotFound(PathBuf),
    /// Invalid JSON syntax or structure.
    Invalid(String),
    /// IO error while reading or writing the rules document.
    Io(String),
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::NotFound(path) => {
                write!(f, "Rules file not found: {}", path.display())
            }
            RuleError::Invalid(msg) => write!(f, "Invalid rules document: {}", msg),
            RuleError::Io(msg) => write!(f, "IO error accessing rules document: {}", msg),
        }
    }
}

impl std::error::Error for RuleError {}

/// Flat settings block of the rules document.
///
/// Every field has a default so a partial (or absent) settings block
/// still yields a usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Destination used when no rule matches the extension.
    #[serde(default = "default_default_folder")]
    pub default_folder: String,

    /// Poll cadence of the folder watcher, in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,

    /// Whether name collisions are resolved by appending `_1`, `_2`, ….
    #[serde(default = "default_enabled")]
    pub handle_duplicates: bool,

    /// Whether missing destination folders are created automatically.
    #[serde(default = "default_enabled")]
    pub create_folders: bool,

    /// Whether extensions are matched case-sensitively. Defaults to false.
    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_default_folder() -> String {
    "Downloads/Others".to_string()
}

fn default_check_interval() -> u64 {
    1
}

fn default_enabled() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_folder: default_default_folder(),
            check_interval_seconds: default_check_interval(),
            handle_duplicates: true,
            create_folders: true,
            case_sensitive: false,
        }
    }
}

/// The rules document as stored on disk.
///
/// `file_extensions` keeps the raw grouped form so that round-tripping
/// preserves whatever grouping the editing front-end chose. Groups whose
/// value is not an object, and entries whose value is not a string, are
/// ignored when the document is flattened into a [`RuleTable`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default)]
    pub file_extensions: BTreeMap<String, Value>,

    #[serde(default)]
    pub settings: Settings,
}

impl RuleDocument {
    /// The built-in rule set used when no document exists anywhere.
    ///
    /// Covers the common document, picture, audio, video and archive
    /// types so the tool is usable with zero configuration.
    pub fn builtin() -> Self {
        let mut file_extensions = BTreeMap::new();
        file_extensions.insert(
            "documents".to_string(),
            json!({
                ".pdf": "Documents",
                ".doc": "Documents",
                ".docx": "Documents",
                ".txt": "Documents",
            }),
        );
        file_extensions.insert(
            "pictures".to_string(),
            json!({
                ".jpg": "Pictures",
                ".jpeg": "Pictures",
                ".png": "Pictures",
                ".gif": "Pictures",
            }),
        );
        file_extensions.insert(
            "music".to_string(),
            json!({
                ".mp3": "Music",
                ".wav": "Music",
                ".flac": "Music",
            }),
        );
        file_extensions.insert(
            "videos".to_string(),
            json!({
                ".mp4": "Videos",
                ".mkv": "Videos",
                ".mov": "Videos",
            }),
        );
        file_extensions.insert(
            "archives".to_string(),
            json!({
                ".zip": "Downloads/Archives",
                ".rar": "Downloads/Archives",
                ".7z": "Downloads/Archives",
            }),
        );

        Self {
            file_extensions,
            settings: Settings::default(),
        }
    }
}

/// Resolve the rules document path.
///
/// Resolution order:
/// 1. An explicitly provided path
/// 2. `./file_rules.json` in the current directory
/// 3. `file_rules.json` under the user's config directory
///
/// When nothing exists, the local path is returned; [`RuleTable::load`]
/// writes a fresh default document there.
pub fn resolve_source(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let local = PathBuf::from(RULES_FILE_NAME);
    if local.exists() {
        return local;
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("tidywatch").join(RULES_FILE_NAME);
        if user_config.exists() {
            return user_config;
        }
    }

    local
}

/// Read and parse a rules document from disk.
pub fn read_document(path: &Path) -> Result<RuleDocument, RuleError> {
    if !path.exists() {
        return Err(RuleError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| RuleError::Io(e.to_string()))?;

    serde_json::from_str(&content).map_err(|e| RuleError::Invalid(e.to_string()))
}

/// Write a rules document to disk, creating parent directories as needed.
pub fn write_document(path: &Path, document: &RuleDocument) -> Result<(), RuleError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| RuleError::Io(e.to_string()))?;
    }

    let content =
        serde_json::to_string_pretty(document).map_err(|e| RuleError::Invalid(e.to_string()))?;

    fs::write(path, content).map_err(|e| RuleError::Io(e.to_string()))
}

/// The flattened, lookup-ready rule table.
///
/// Owned by the monitor and read by the placer; it is only ever replaced
/// wholesale (build a complete new table, then swap), so a lookup never
/// observes a half-updated mapping.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: HashMap<String, String>,
    settings: Settings,
}

impl RuleTable {
    /// Flatten a document into a lookup table.
    ///
    /// Extension keys are normalized to include their leading dot and,
    /// unless case-sensitive matching is enabled, lower-cased. Duplicate
    /// keys resolve last-write-wins.
    pub fn from_document(document: &RuleDocument) -> Self {
        let settings = document.settings.clone();
        let mut rules = HashMap::new();

        for (group, entries) in &document.file_extensions {
            // Reserved comment groups
            if group.starts_with('_') {
                continue;
            }
            let Value::Object(entries) = entries else {
                continue;
            };
            for (extension, destination) in entries {
                let Value::String(destination) = destination else {
                    continue;
                };
                rules.insert(
                    normalize_extension(extension, settings.case_sensitive),
                    destination.clone(),
                );
            }
        }

        Self { rules, settings }
    }

    /// Load a rule table from the given path.
    ///
    /// A missing document is replaced by the built-in defaults, and a
    /// fresh default document is written to the path so a rule-editing
    /// front-end has something to open.
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        if !path.exists() {
            let document = RuleDocument::builtin();
            write_document(path, &document)?;
            return Ok(Self::from_document(&document));
        }

        let document = read_document(path)?;
        Ok(Self::from_document(&document))
    }

    /// Replace this table with a freshly parsed copy of the document.
    ///
    /// The new table is built completely before the swap; on any read or
    /// parse failure the current table is left untouched and remains
    /// authoritative.
    pub fn reload(&mut self, path: &Path) -> Result<(), RuleError> {
        let document = read_document(path)?;
        *self = Self::from_document(&document);
        Ok(())
    }

    /// Look up the destination folder for an extension.
    ///
    /// The extension is expected with its leading dot (`".pdf"`).
    /// Unmatched extensions resolve to the default folder.
    pub fn lookup(&self, extension: &str) -> &str {
        let key = normalize_extension(extension, self.settings.case_sensitive);
        self.rules
            .get(&key)
            .map(String::as_str)
            .unwrap_or(&self.settings.default_folder)
    }

    /// Destination used when no rule matches.
    pub fn default_folder(&self) -> &str {
        &self.settings.default_folder
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of extension rules in the table.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rules grouped by destination folder, extensions sorted, for display.
    pub fn rules_by_folder(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (extension, folder) in &self.rules {
            groups.entry(folder.as_str()).or_default().push(extension);
        }
        for extensions in groups.values_mut() {
            extensions.sort();
        }
        groups
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::from_document(&RuleDocument::builtin())
    }
}

fn normalize_extension(extension: &str, case_sensitive: bool) -> String {
    let with_dot = if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    };
    if case_sensitive {
        with_dot
    } else {
        with_dot.to_lowercase()
    }
}
