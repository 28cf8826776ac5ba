use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;
use zip::ZipArchive;

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::types::{ArchiveInput, ChangeStatus, DirectoryInput, TransformInputs, TypeName, WorkingSet};

/// Turns host change notifications into a [`WorkingSet`].
pub struct ChangeSetScanner {
    extension: String,
    exclude: GlobSet,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::BadPattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::BadPattern {
        pattern: patterns.join(", "),
        source,
    })
}

impl ChangeSetScanner {
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self {
            extension: config.type_extension.clone(),
            exclude: build_globset(&config.exclude)?,
        })
    }

    /// Scan every directory and archive input. Any archive that fails to
    /// open aborts the whole scan.
    pub fn scan(&self, inputs: &TransformInputs) -> Result<WorkingSet, ScanError> {
        let mut working_set = WorkingSet::new();
        for dir in &inputs.directories {
            self.scan_directory(dir, &mut working_set)?;
        }
        for archive in &inputs.archives {
            self.scan_archive(archive, &mut working_set)?;
        }
        debug!(
            direct = working_set.direct_units.len(),
            referenced = working_set.referenced_units.len(),
            "change set scanned"
        );
        Ok(working_set)
    }

    fn scan_directory(&self, input: &DirectoryInput, out: &mut WorkingSet) -> Result<(), ScanError> {
        for (file, status) in &input.changed_files {
            if !status.is_live() {
                debug!(file = %file.display(), %status, "skipping");
                continue;
            }
            let relative = file
                .strip_prefix(&input.root)
                .map_err(|_| ScanError::OutsideRoot {
                    file: file.clone(),
                    root: input.root.clone(),
                })?;
            let entry = slash_path(relative);
            if !self.accepts(&entry) {
                debug!(file = %file.display(), "not a type file or excluded");
                continue;
            }
            out.direct_units
                .insert(TypeName::from_relative_path(relative, &self.extension));
        }
        Ok(())
    }

    fn scan_archive(&self, input: &ArchiveInput, out: &mut WorkingSet) -> Result<(), ScanError> {
        if input.status == ChangeStatus::Removed {
            debug!(archive = %input.path.display(), "archive removed, skipping");
            return Ok(());
        }

        let file = File::open(&input.path).map_err(|e| ScanError::ArchiveOpen {
            path: input.path.clone(),
            source: e.into(),
        })?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|source| ScanError::ArchiveOpen {
                path: input.path.clone(),
                source,
            })?;

        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|source| ScanError::ArchiveEntry {
                    path: input.path.clone(),
                    index,
                    source,
                })?;
            let name = entry.name();
            if entry.is_dir() || name.ends_with('\\') {
                continue;
            }
            if !self.accepts(&name.replace('\\', "/")) {
                continue;
            }
            out.referenced_units
                .insert(TypeName::from_entry_path(name, &self.extension));
        }
        // The archive handle is released when `archive` drops here, on every path.
        Ok(())
    }

    fn accepts(&self, entry: &str) -> bool {
        entry.ends_with(&self.extension) && !self.exclude.is_match(entry)
    }
}

fn slash_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelsieve_test_fixtures::{class_bytes, write_archive};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn scanner() -> ChangeSetScanner {
        ChangeSetScanner::new(&ScanConfig::default()).unwrap()
    }

    fn dir_input(root: &Path, files: &[(&str, ChangeStatus)]) -> DirectoryInput {
        let changed_files: BTreeMap<PathBuf, ChangeStatus> = files
            .iter()
            .map(|(rel, status)| (root.join(rel), *status))
            .collect();
        DirectoryInput {
            root: root.to_path_buf(),
            changed_files,
        }
    }

    fn names(set: &std::collections::BTreeSet<TypeName>) -> Vec<&str> {
        set.iter().map(TypeName::as_str).collect()
    }

    #[test]
    fn test_directory_skips_unchanged_and_removed() {
        let root = PathBuf::from("/build/classes");
        let inputs = TransformInputs {
            directories: vec![dir_input(
                &root,
                &[
                    ("Foo.class", ChangeStatus::Modified),
                    ("Bar.class", ChangeStatus::Unchanged),
                    ("Baz.class", ChangeStatus::Removed),
                    ("com/example/New.class", ChangeStatus::Added),
                ],
            )],
            archives: vec![],
        };
        let ws = scanner().scan(&inputs).unwrap();
        assert_eq!(names(&ws.direct_units), vec!["Foo", "com.example.New"]);
        assert!(ws.referenced_units.is_empty());
    }

    #[test]
    fn test_directory_ignores_non_type_files_and_excludes() {
        let root = PathBuf::from("/out");
        let inputs = TransformInputs {
            directories: vec![dir_input(
                &root,
                &[
                    ("res/strings.xml", ChangeStatus::Added),
                    ("com/x/package-info.class", ChangeStatus::Added),
                    ("com/x/Model.class", ChangeStatus::Added),
                ],
            )],
            archives: vec![],
        };
        let ws = scanner().scan(&inputs).unwrap();
        assert_eq!(names(&ws.direct_units), vec!["com.x.Model"]);
    }

    #[test]
    fn test_directory_file_outside_root_is_an_error() {
        let mut input = dir_input(Path::new("/out"), &[]);
        input
            .changed_files
            .insert(PathBuf::from("/elsewhere/Foo.class"), ChangeStatus::Added);
        let inputs = TransformInputs {
            directories: vec![input],
            archives: vec![],
        };
        let err = scanner().scan(&inputs).unwrap_err();
        assert!(matches!(err, ScanError::OutsideRoot { .. }));
    }

    #[test]
    fn test_archive_entries_become_referenced_units() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("dep.jar");
        write_archive(
            &jar,
            &[
                ("pkg/", vec![]),
                ("pkg/Qux.class", class_bytes("pkg/Qux", "java/lang/Object")),
                ("pkg\\win\\Legacy.class", class_bytes("pkg/win/Legacy", "java/lang/Object")),
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".to_vec()),
                ("META-INF/versions/9/pkg/Qux.class", vec![0xCA, 0xFE]),
                ("pkg/notes.txt", b"hello".to_vec()),
            ],
        );
        let inputs = TransformInputs {
            directories: vec![],
            archives: vec![ArchiveInput {
                path: jar,
                status: ChangeStatus::Unchanged,
            }],
        };
        let ws = scanner().scan(&inputs).unwrap();
        assert!(ws.direct_units.is_empty());
        assert_eq!(names(&ws.referenced_units), vec!["pkg.Qux", "pkg.win.Legacy"]);
    }

    #[test]
    fn test_removed_archive_is_skipped_without_opening() {
        let inputs = TransformInputs {
            directories: vec![],
            archives: vec![ArchiveInput {
                path: PathBuf::from("/does/not/exist.jar"),
                status: ChangeStatus::Removed,
            }],
        };
        let ws = scanner().scan(&inputs).unwrap();
        assert!(ws.is_empty());
    }

    #[test]
    fn test_unopenable_archive_aborts_scan() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("broken.jar");
        std::fs::write(&bogus, b"not a zip").unwrap();
        let inputs = TransformInputs {
            directories: vec![dir_input(dir.path(), &[("Foo.class", ChangeStatus::Added)])],
            archives: vec![ArchiveInput {
                path: bogus,
                status: ChangeStatus::Added,
            }],
        };
        let err = scanner().scan(&inputs).unwrap_err();
        assert!(matches!(err, ScanError::ArchiveOpen { .. }));
    }

    #[test]
    fn test_bad_exclude_pattern() {
        let config = ScanConfig {
            exclude: vec!["[unclosed".to_string()],
            ..ScanConfig::default()
        };
        assert!(matches!(
            ChangeSetScanner::new(&config),
            Err(ScanError::BadPattern { .. })
        ));
    }
}
