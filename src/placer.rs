/// File placement: compute a non-colliding destination and perform the move.
///
/// This module takes a freshly arrived file, resolves its destination
/// folder through the rule table, and relocates it. It handles
/// destination-folder creation, name-collision disambiguation, and the
/// per-file failure taxonomy of the monitor.
use crate::rules::RuleTable;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of a placement attempt that is not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The file was relocated to `destination`.
    Moved { destination: PathBuf },
    /// The file has no extension; nothing was touched.
    SkippedNoExtension,
    /// The file disappeared between detection and the move attempt.
    SourceVanished,
}

/// Errors that can occur while placing a file.
#[derive(Debug)]
pub enum PlaceError {
    /// Destination folder is missing and auto-creation is disabled.
    MissingDestination { path: PathBuf },
    /// A file of the same name already exists and duplicate handling is disabled.
    AlreadyExists { path: PathBuf },
    /// The OS refused access to the source or destination.
    PermissionDenied {
        path: PathBuf,
        source: io::Error,
    },
    /// Failed to create the destination folder.
    DirectoryCreationFailed {
        path: PathBuf,
        source: io::Error,
    },
    /// The move itself failed for another OS-level reason.
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        source_error: io::Error,
    },
}

impl std::fmt::Display for PlaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDestination { path } => {
                write!(f, "Destination folder doesn't exist: {}", path.display())
            }
            Self::AlreadyExists { path } => {
                write!(f, "File already exists: {}", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(f, "Permission denied for {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::MoveFailed {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
        }
    }
}

impl std::error::Error for PlaceError {}

/// Places arrived files into their destination folders.
///
/// Destinations from the rule table are relative; they are resolved
/// against `dest_root` (the user's home directory in the CLI).
pub struct Placer {
    dest_root: PathBuf,
}

impl Placer {
    pub fn new(dest_root: impl Into<PathBuf>) -> Self {
        Self {
            dest_root: dest_root.into(),
        }
    }

    /// Move a file out of `directory` into the folder its extension maps to.
    ///
    /// Files without an extension are skipped without touching the
    /// filesystem. A source that vanished between detection and the move
    /// attempt is tolerated, not an error. On failure the source file is
    /// left in place; an existing destination file is never overwritten
    /// except through the explicit `_N` disambiguation.
    pub fn place(
        &self,
        directory: &Path,
        file_name: &str,
        rules: &RuleTable,
    ) -> Result<Placement, PlaceError> {
        let Some(extension) = Path::new(file_name).extension() else {
            return Ok(Placement::SkippedNoExtension);
        };
        let extension = format!(".{}", extension.to_string_lossy());

        let source = directory.join(file_name);
        if !source.exists() {
            return Ok(Placement::SourceVanished);
        }

        let settings = rules.settings();
        let dest_dir = self.dest_root.join(rules.lookup(&extension));

        if settings.create_folders {
            fs::create_dir_all(&dest_dir).map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => PlaceError::PermissionDenied {
                    path: dest_dir.clone(),
                    source: e,
                },
                _ => PlaceError::DirectoryCreationFailed {
                    path: dest_dir.clone(),
                    source: e,
                },
            })?;
        } else if !dest_dir.exists() {
            return Err(PlaceError::MissingDestination { path: dest_dir });
        }

        let mut destination = dest_dir.join(file_name);
        if destination.exists() {
            if settings.handle_duplicates {
                destination = disambiguate(&dest_dir, file_name);
            } else {
                return Err(PlaceError::AlreadyExists { path: destination });
            }
        }

        match move_file(&source, &destination) {
            Ok(()) => Ok(Placement::Moved { destination }),
            Err(_) if !source.exists() => Ok(Placement::SourceVanished),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(PlaceError::PermissionDenied { path: source, source: e })
            }
            Err(e) => Err(PlaceError::MoveFailed {
                source,
                destination,
                source_error: e,
            }),
        }
    }
}

/// Find the first free `stem_N.ext` name in the destination folder.
///
/// Probes sequentially starting at 1; placements run one at a time, so
/// the scan cannot race another placement within the process.
fn disambiguate(dest_dir: &Path, file_name: &str) -> PathBuf {
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let suffix = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = dest_dir.join(format!("{}_{}{}", stem, counter, suffix));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move a file, falling back to copy+delete when the rename crosses volumes.
fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleDocument;
    use std::fs;
    use tempfile::TempDir;

    fn rules_json(json: &str) -> RuleTable {
        let document: RuleDocument = serde_json::from_str(json).expect("valid test document");
        RuleTable::from_document(&document)
    }

    fn pdf_rules() -> RuleTable {
        rules_json(r#"{ "file_extensions": { "docs": { ".pdf": "Documents" } } }"#)
    }

    #[test]
    fn test_place_moves_file_to_mapped_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        fs::create_dir(&inbox).unwrap();
        fs::write(inbox.join("report.pdf"), b"content").unwrap();

        let placer = Placer::new(temp_dir.path());
        let result = placer.place(&inbox, "report.pdf", &pdf_rules()).unwrap();

        let expected = temp_dir.path().join("Documents").join("report.pdf");
        assert_eq!(result, Placement::Moved { destination: expected.clone() });
        assert!(expected.exists());
        assert!(!inbox.join("report.pdf").exists());
    }

    #[test]
    fn test_place_unmatched_extension_goes_to_default_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        fs::create_dir(&inbox).unwrap();
        fs::write(inbox.join("data.xyz"), b"content").unwrap();

        let placer = Placer::new(temp_dir.path());
        placer.place(&inbox, "data.xyz", &pdf_rules()).unwrap();

        assert!(
            temp_dir
                .path()
                .join("Downloads")
                .join("Others")
                .join("data.xyz")
                .exists()
        );
    }

    #[test]
    fn test_place_no_extension_is_a_no_op() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        fs::create_dir(&inbox).unwrap();
        fs::write(inbox.join("README"), b"content").unwrap();

        let placer = Placer::new(temp_dir.path());
        let result = placer.place(&inbox, "README", &pdf_rules()).unwrap();

        assert_eq!(result, Placement::SkippedNoExtension);
        assert!(inbox.join("README").exists());
        // Nothing else was created alongside the inbox.
        let entries = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_place_vanished_source_is_tolerated() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        fs::create_dir(&inbox).unwrap();

        let placer = Placer::new(temp_dir.path());
        let result = placer.place(&inbox, "ghost.pdf", &pdf_rules()).unwrap();

        assert_eq!(result, Placement::SourceVanished);
    }

    #[test]
    fn test_collision_appends_counter() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        let documents = temp_dir.path().join("Documents");
        fs::create_dir(&inbox).unwrap();
        fs::create_dir(&documents).unwrap();
        fs::write(documents.join("report.pdf"), b"old").unwrap();
        fs::write(inbox.join("report.pdf"), b"new").unwrap();

        let placer = Placer::new(temp_dir.path());
        let result = placer.place(&inbox, "report.pdf", &pdf_rules()).unwrap();

        assert_eq!(
            result,
            Placement::Moved { destination: documents.join("report_1.pdf") }
        );
        assert!(documents.join("report_1.pdf").exists());
        assert_eq!(fs::read(documents.join("report.pdf")).unwrap(), b"old");
    }

    #[test]
    fn test_collision_counter_skips_taken_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        let documents = temp_dir.path().join("Documents");
        fs::create_dir(&inbox).unwrap();
        fs::create_dir(&documents).unwrap();
        fs::write(documents.join("report.pdf"), b"a").unwrap();
        fs::write(documents.join("report_1.pdf"), b"b").unwrap();
        fs::write(inbox.join("report.pdf"), b"c").unwrap();

        let placer = Placer::new(temp_dir.path());
        let result = placer.place(&inbox, "report.pdf", &pdf_rules()).unwrap();

        assert_eq!(
            result,
            Placement::Moved { destination: documents.join("report_2.pdf") }
        );
    }

    #[test]
    fn test_collision_rejected_when_duplicates_disabled() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        let documents = temp_dir.path().join("Documents");
        fs::create_dir(&inbox).unwrap();
        fs::create_dir(&documents).unwrap();
        fs::write(documents.join("report.pdf"), b"original").unwrap();
        fs::write(inbox.join("report.pdf"), b"incoming").unwrap();

        let rules = rules_json(
            r#"{
                "file_extensions": { "docs": { ".pdf": "Documents" } },
                "settings": { "handle_duplicates": false }
            }"#,
        );
        let placer = Placer::new(temp_dir.path());
        let result = placer.place(&inbox, "report.pdf", &rules);

        assert!(matches!(result, Err(PlaceError::AlreadyExists { .. })));
        // Destination untouched, source not removed.
        assert_eq!(fs::read(documents.join("report.pdf")).unwrap(), b"original");
        assert_eq!(fs::read(inbox.join("report.pdf")).unwrap(), b"incoming");
    }

    #[test]
    fn test_missing_destination_without_auto_creation() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        fs::create_dir(&inbox).unwrap();
        fs::write(inbox.join("report.pdf"), b"content").unwrap();

        let rules = rules_json(
            r#"{
                "file_extensions": { "docs": { ".pdf": "Documents" } },
                "settings": { "create_folders": false }
            }"#,
        );
        let placer = Placer::new(temp_dir.path());
        let result = placer.place(&inbox, "report.pdf", &rules);

        assert!(matches!(result, Err(PlaceError::MissingDestination { .. })));
        assert!(inbox.join("report.pdf").exists());
        assert!(!temp_dir.path().join("Documents").exists());
    }

    #[test]
    fn test_multi_segment_destination_creates_nested_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let inbox = temp_dir.path().join("inbox");
        fs::create_dir(&inbox).unwrap();
        fs::write(inbox.join("bundle.zip"), b"content").unwrap();

        let rules = rules_json(
            r#"{ "file_extensions": { "archives": { ".zip": "Downloads/Archives" } } }"#,
        );
        let placer = Placer::new(temp_dir.path());
        placer.place(&inbox, "bundle.zip", &rules).unwrap();

        assert!(
            temp_dir
                .path()
                .join("Downloads")
                .join("Archives")
                .join("bundle.zip")
                .exists()
        );
    }
}
