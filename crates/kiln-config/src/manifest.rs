//! Order-preserving `package.json` model.
//!
//! A [`Manifest`] keeps the whole JSON document so that keys kiln does not
//! understand survive a load/save round-trip untouched and in place. Typed
//! accessors cover the fields kiln reads or writes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ConfigError, Result};

pub const MANIFEST_FILE: &str = "package.json";

/// Key of the kiln configuration block inside `package.json`.
pub const TOOL_KEY: &str = "kiln";

/// Position new keys are inserted at, relative to keys already present.
const CANONICAL_ORDER: &[&str] = &[
    "name",
    "version",
    "description",
    "main",
    "module",
    "umd:main",
    "browser",
    "types",
    "files",
    "license",
    "scripts",
    "dependencies",
    "devDependencies",
    "peerDependencies",
];

/// The `kiln` block of a manifest.
///
/// The same shape is used at every level; which keys are meaningful depends
/// on where the manifest sits (`packages` at a monorepo root, `entrypoints`
/// in a package, `umdName` in an entrypoint).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoints: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umd_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    directory: PathBuf,
    document: Map<String, Value>,
}

impl Manifest {
    /// Load `package.json` from `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoManifest`] when the file does not exist and
    /// [`ConfigError::InvalidJson`] when it is not a JSON object.
    pub fn load(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let document = read_document(&directory)?;
        debug!(path = %directory.display(), "loaded manifest");
        Ok(Self {
            directory,
            document,
        })
    }

    /// Build a manifest from an in-memory value (not yet on disk).
    pub fn from_value(directory: impl Into<PathBuf>, value: Value) -> Result<Self> {
        let directory = directory.into();
        match value {
            Value::Object(document) => Ok(Self {
                directory,
                document,
            }),
            other => Err(ConfigError::InvalidJson {
                path: directory.join(MANIFEST_FILE),
                message: format!("expected an object, found {other}"),
            }),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(MANIFEST_FILE)
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Persist the document, replacing the file atomically.
    pub fn save(&self) -> Result<()> {
        let path = self.path();
        let mut content = serde_json::to_string_pretty(&self.document).map_err(|e| {
            ConfigError::InvalidJson {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        content.push('\n');

        let tmp = self.directory.join(format!(".{MANIFEST_FILE}.tmp"));
        fs::write(&tmp, content)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        debug!(path = %path.display(), "saved manifest");
        Ok(())
    }

    /// Re-read the document from disk, dropping unsaved changes.
    pub fn refresh(&mut self) -> Result<()> {
        self.document = read_document(&self.directory)?;
        debug!(path = %self.directory.display(), "refreshed manifest");
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.string_field("name")
    }

    pub fn version(&self) -> Option<&str> {
        self.string_field("version")
    }

    pub fn is_private(&self) -> bool {
        self.document
            .get("private")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn string_field(&self, key: &str) -> Option<&str> {
        self.document.get(key).and_then(Value::as_str)
    }

    /// Set `key`, keeping its position when it already exists and otherwise
    /// inserting it after the closest preceding key in canonical order.
    pub fn set_field(&mut self, key: &str, value: Value) {
        if let Some(slot) = self.document.get_mut(key) {
            *slot = value;
            return;
        }

        let anchor = CANONICAL_ORDER
            .iter()
            .position(|k| *k == key)
            .and_then(|idx| {
                CANONICAL_ORDER[..idx]
                    .iter()
                    .rev()
                    .find(|k| self.document.contains_key(**k))
            });

        let Some(anchor) = anchor else {
            self.document.insert(key.to_string(), value);
            return;
        };

        let previous = std::mem::take(&mut self.document);
        let mut value = Some(value);
        for (k, v) in previous {
            let is_anchor = k == *anchor;
            self.document.insert(k, v);
            if is_anchor {
                if let Some(value) = value.take() {
                    self.document.insert(key.to_string(), value);
                }
            }
        }
    }

    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.document.shift_remove(key)
    }

    pub fn dependencies(&self) -> Vec<&str> {
        self.dependency_table("dependencies")
    }

    pub fn peer_dependencies(&self) -> Vec<&str> {
        self.dependency_table("peerDependencies")
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies().contains(&name) || self.peer_dependencies().contains(&name)
    }

    fn dependency_table(&self, key: &str) -> Vec<&str> {
        self.document
            .get(key)
            .and_then(Value::as_object)
            .map(|deps| deps.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn script(&self, name: &str) -> Option<&str> {
        self.document
            .get("scripts")
            .and_then(|s| s.get(name))
            .and_then(Value::as_str)
    }

    pub fn set_script(&mut self, name: &str, command: &str) {
        if !matches!(self.document.get("scripts"), Some(Value::Object(_))) {
            self.set_field("scripts", Value::Object(Map::new()));
        }
        if let Some(Value::Object(scripts)) = self.document.get_mut("scripts") {
            scripts.insert(name.to_string(), Value::String(command.to_string()));
        }
    }

    /// Parse the `kiln` block. A missing block yields the default config.
    pub fn tool_config(&self) -> Result<ToolConfig> {
        match self.document.get(TOOL_KEY) {
            None | Some(Value::Null) => Ok(ToolConfig::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidValue {
                    path: self.path(),
                    field: TOOL_KEY.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}

fn read_document(directory: &Path) -> Result<Map<String, Value>> {
    let path = directory.join(MANIFEST_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NoManifest(directory.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(ConfigError::InvalidJson {
            path,
            message: format!("expected an object, found {other}"),
        }),
        Err(e) => Err(ConfigError::InvalidJson {
            path,
            message: e.to_string(),
        }),
    }
}
