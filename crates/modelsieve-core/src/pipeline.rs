use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::classifier::{ModelClassifier, Verdict};
use crate::classpath::Classpath;
use crate::config::{Config, CONFIG_FILE};
use crate::resolver::ClasspathResolver;
use crate::scanner::ChangeSetScanner;
use crate::types::{TransformInputs, TypeName, WorkingSet};

/// Everything one incremental pass produces.
#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub working_set: WorkingSet,
    pub verdicts: BTreeMap<TypeName, Verdict>,
    pub models: BTreeSet<TypeName>,
}

/// One scan-then-classify pass over the host's change notifications.
pub struct IncrementalPass {
    config: Config,
    scanner: ChangeSetScanner,
    classifier: ModelClassifier,
    library: Vec<PathBuf>,
}

impl IncrementalPass {
    pub fn new(config: Config) -> Result<Self> {
        let scanner =
            ChangeSetScanner::new(&config.scan).context("invalid [scan] configuration")?;
        let classifier = ModelClassifier::new(&config.markers);
        let library = config.classpath.library.clone();
        Ok(Self {
            config,
            scanner,
            classifier,
            library,
        })
    }

    /// Append library classpath entries on top of the configured ones.
    pub fn with_library(mut self, entries: impl IntoIterator<Item = PathBuf>) -> Self {
        self.library.extend(entries);
        self
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scan(&self, inputs: &TransformInputs) -> Result<WorkingSet> {
        self.scanner
            .scan(inputs)
            .context("failed to scan change set")
    }

    /// Build the per-pass resolver: output directories, then live archives,
    /// then library entries.
    pub fn resolver(&self, inputs: &TransformInputs) -> Result<ClasspathResolver> {
        let mut classpath = Classpath::new(&self.config.scan.type_extension);
        for dir in &inputs.directories {
            classpath.add_directory(&dir.root);
        }
        for archive in inputs.live_archives() {
            classpath
                .add_archive(&archive.path)
                .with_context(|| format!("failed to add '{}' to classpath", archive.path.display()))?;
        }
        for entry in &self.library {
            classpath
                .add_entry(entry)
                .with_context(|| format!("failed to add library '{}' to classpath", entry.display()))?;
        }
        Ok(ClasspathResolver::new(classpath))
    }

    pub fn run(&self, inputs: &TransformInputs) -> Result<PassOutcome> {
        let working_set = self.scan(inputs)?;
        let mut resolver = self.resolver(inputs)?;
        let verdicts = self
            .classifier
            .classify_detailed(&working_set.direct_units, &mut resolver)
            .context("failed to classify model types")?;
        let models: BTreeSet<TypeName> = verdicts
            .iter()
            .filter(|(_, v)| v.is_model())
            .map(|(name, _)| name.clone())
            .collect();

        info!(
            direct = working_set.direct_units.len(),
            referenced = working_set.referenced_units.len(),
            models = models.len(),
            resolved = resolver.resolved_count(),
            "incremental pass complete"
        );

        Ok(PassOutcome {
            working_set,
            verdicts,
            models,
        })
    }
}

/// Walk up from `start` looking for `.modelsieve.toml` or `.git` to find the project root.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        if current.join(CONFIG_FILE).exists() || current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}
