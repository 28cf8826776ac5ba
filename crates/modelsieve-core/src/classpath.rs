use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::ResolveError;
use crate::types::TypeName;

/// Raw bytes of a located type file and a description of where it came from.
pub struct ClassBytes {
    pub bytes: Vec<u8>,
    pub origin: String,
}

/// An archive opened once per pass, with entries indexed by type name.
pub struct ArchiveSource {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    entries: HashMap<TypeName, usize>,
}

impl ArchiveSource {
    pub fn open(path: &Path, extension: &str) -> Result<Self, ResolveError> {
        let archive_err = |source: zip::result::ZipError| ResolveError::Archive {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(|e| archive_err(e.into()))?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(archive_err)?;

        let mut entries = HashMap::new();
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(archive_err)?;
            let name = entry.name();
            if entry.is_dir() || !name.ends_with(extension) {
                continue;
            }
            // First entry wins, matching classpath precedence.
            entries
                .entry(TypeName::from_entry_path(name, extension))
                .or_insert(index);
        }
        debug!(archive = %path.display(), types = entries.len(), "indexed archive");

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            entries,
        })
    }

    fn read(&mut self, name: &TypeName) -> Result<Option<ClassBytes>, ResolveError> {
        let Some(&index) = self.entries.get(name) else {
            return Ok(None);
        };
        let origin = self.path.display().to_string();
        let mut entry = self
            .archive
            .by_index(index)
            .map_err(|source| ResolveError::Archive {
                path: self.path.clone(),
                source,
            })?;
        let mut bytes = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| ResolveError::Io {
                name: name.clone(),
                origin: origin.clone(),
                source,
            })?;
        Ok(Some(ClassBytes { bytes, origin }))
    }
}

/// Largest preallocation taken on trust from an archive header.
const MAX_CAPACITY_HINT: u64 = 1 << 20;

fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_CAPACITY_HINT) as usize
}

/// One element of the aggregate classpath.
pub enum ClassSource {
    Directory(PathBuf),
    Archive(ArchiveSource),
}

/// Ordered class sources; the first source holding a type wins.
pub struct Classpath {
    extension: String,
    sources: Vec<ClassSource>,
}

impl Classpath {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            sources: Vec::new(),
        }
    }

    pub fn add_directory(&mut self, root: &Path) {
        self.sources.push(ClassSource::Directory(root.to_path_buf()));
    }

    pub fn add_archive(&mut self, path: &Path) -> Result<(), ResolveError> {
        let source = ArchiveSource::open(path, &self.extension)?;
        self.sources.push(ClassSource::Archive(source));
        Ok(())
    }

    /// Add a directory or an archive depending on what `path` is on disk.
    pub fn add_entry(&mut self, path: &Path) -> Result<(), ResolveError> {
        if path.is_dir() {
            self.add_directory(path);
            Ok(())
        } else {
            self.add_archive(path)
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Locate the compiled bytes for `name`, or `None` if no source has it.
    pub fn find(&mut self, name: &TypeName) -> Result<Option<ClassBytes>, ResolveError> {
        let resource = name.resource_path(&self.extension);
        for source in &mut self.sources {
            match source {
                ClassSource::Directory(root) => {
                    let path = root.join(&resource);
                    match std::fs::read(&path) {
                        Ok(bytes) => {
                            return Ok(Some(ClassBytes {
                                bytes,
                                origin: path.display().to_string(),
                            }))
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                        Err(source) => {
                            return Err(ResolveError::Io {
                                name: name.clone(),
                                origin: path.display().to_string(),
                                source,
                            })
                        }
                    }
                }
                ClassSource::Archive(archive) => {
                    if let Some(found) = archive.read(name)? {
                        return Ok(Some(found));
                    }
                }
            }
        }
        Ok(None)
    }
}
