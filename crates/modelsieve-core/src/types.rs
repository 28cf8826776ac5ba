use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Fully qualified, dot-separated type name: "com.example.Foo"
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build from the slash-separated internal form used inside class files.
    pub fn from_internal(internal: &str) -> Self {
        Self(internal.replace('/', "."))
    }

    /// Build from an archive entry path. Archive tooling may write either
    /// separator, so both `/` and `\` are normalized.
    pub fn from_entry_path(entry: &str, extension: &str) -> Self {
        let stem = entry.strip_suffix(extension).unwrap_or(entry);
        Self(stem.replace(['/', '\\'], "."))
    }

    /// Build from a path relative to a class output directory, using the
    /// platform's own notion of path components.
    pub fn from_relative_path(relative: &Path, extension: &str) -> Self {
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let joined = parts.join(".");
        let stem = joined.strip_suffix(extension).unwrap_or(&joined);
        Self(stem.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Slash-separated form, e.g. "com/example/Foo".
    pub fn internal_name(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Relative resource path of this type's compiled file.
    pub fn resource_path(&self, extension: &str) -> String {
        format!("{}{extension}", self.internal_name())
    }

    pub fn package(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(pkg, _)| pkg)
    }

    pub fn simple_name(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Change status reported by the host build tool for a file or a whole archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    #[serde(alias = "changed")]
    Modified,
    Removed,
    #[serde(alias = "notchanged")]
    Unchanged,
}

impl ChangeStatus {
    /// True for statuses whose entries need transformation in this pass.
    pub fn is_live(&self) -> bool {
        matches!(self, ChangeStatus::Added | ChangeStatus::Modified)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Removed => write!(f, "removed"),
            ChangeStatus::Unchanged => write!(f, "unchanged"),
        }
    }
}

impl std::str::FromStr for ChangeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "added" => Ok(ChangeStatus::Added),
            "modified" | "changed" => Ok(ChangeStatus::Modified),
            "removed" => Ok(ChangeStatus::Removed),
            "unchanged" | "notchanged" => Ok(ChangeStatus::Unchanged),
            _ => Err(anyhow::anyhow!("unknown change status: {s}")),
        }
    }
}

/// A class output directory together with the per-file statuses for this build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryInput {
    pub root: PathBuf,
    #[serde(default)]
    pub changed_files: BTreeMap<PathBuf, ChangeStatus>,
}

/// A dependency archive with one status for the archive as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveInput {
    pub path: PathBuf,
    pub status: ChangeStatus,
}

/// Change notifications supplied by the host build tool for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformInputs {
    #[serde(default)]
    pub directories: Vec<DirectoryInput>,
    #[serde(default)]
    pub archives: Vec<ArchiveInput>,
}

impl TransformInputs {
    /// Parse the JSON change manifest handed over by the host.
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Archives that still exist on the classpath for this pass.
    pub fn live_archives(&self) -> impl Iterator<Item = &ArchiveInput> {
        self.archives
            .iter()
            .filter(|a| a.status != ChangeStatus::Removed)
    }
}

/// Types to transform (`direct_units`) and types usable only as resolution
/// context (`referenced_units`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingSet {
    pub direct_units: BTreeSet<TypeName>,
    pub referenced_units: BTreeSet<TypeName>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.direct_units.is_empty() && self.referenced_units.is_empty()
    }
}
