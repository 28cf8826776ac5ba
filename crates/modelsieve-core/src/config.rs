use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::TypeName;

pub const CONFIG_FILE: &str = ".modelsieve.toml";

/// Top-level configuration from `.modelsieve.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub markers: MarkersConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub classpath: ClasspathConfig,
}

/// Fixed identifiers the classifier keys on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkersConfig {
    #[serde(default = "default_model_annotation")]
    pub model_annotation: TypeName,
    #[serde(default = "default_proxy_interface")]
    pub proxy_interface: TypeName,
    #[serde(default = "default_sentinel_base")]
    pub sentinel_base: TypeName,
}

fn default_model_annotation() -> TypeName {
    TypeName::new("io.realm.annotations.RealmClass")
}

fn default_proxy_interface() -> TypeName {
    TypeName::new("io.realm.internal.RealmObjectProxy")
}

fn default_sentinel_base() -> TypeName {
    TypeName::new("io.realm.RealmObject")
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            model_annotation: default_model_annotation(),
            proxy_interface: default_proxy_interface(),
            sentinel_base: default_sentinel_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_type_extension")]
    pub type_extension: String,
    /// Glob patterns over `/`-separated entry paths that never become units.
    #[serde(default = "default_exclude_patterns")]
    pub exclude: Vec<String>,
}

fn default_type_extension() -> String {
    ".class".to_string()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "META-INF/**".to_string(),
        "**/module-info.class".to_string(),
        "**/package-info.class".to_string(),
    ]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            type_extension: default_type_extension(),
            exclude: default_exclude_patterns(),
        }
    }
}

/// Extra class sources backing the resolver, e.g. a platform SDK archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClasspathConfig {
    #[serde(default)]
    pub library: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from a `.modelsieve.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `modelsieve init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.modelsieve.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!(
                            "failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for `modelsieve init`.
    pub fn default_toml() -> String {
        r#"# modelsieve - incremental model classification

[markers]
# Annotation that marks a type as a domain model definition
model_annotation = "io.realm.annotations.RealmClass"
# Interface implemented only by generated proxy classes
proxy_interface = "io.realm.internal.RealmObjectProxy"
# Universal base type of all domain objects, never classified itself
sentinel_base = "io.realm.RealmObject"

[scan]
type_extension = ".class"
exclude = ["META-INF/**", "**/module-info.class", "**/package-info.class"]

[classpath]
# Directories or archives consulted when resolving supertypes
# library = ["/opt/android-sdk/platforms/android-34/android.jar"]
library = []
"#
        .to_string()
    }
}
