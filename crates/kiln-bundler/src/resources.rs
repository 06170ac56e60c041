//! Per-invocation build resources: the worker pool and the dependency
//! manifest cache.
//!
//! A [`BuildResources`] is created once per top-level command, shared by every
//! build task through an `Arc`, and disposed when the command finishes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::{Error, Result};

/// The fields of a dependency's `package.json` the externals walk needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyManifest {
    #[serde(default)]
    pub name: String,

    #[serde(skip)]
    pub directory: PathBuf,

    #[serde(default, deserialize_with = "names")]
    pub dependencies: Vec<String>,

    #[serde(default, deserialize_with = "names")]
    pub peer_dependencies: Vec<String>,
}

fn names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let table: Option<serde_json::Map<String, serde_json::Value>> =
        Option::deserialize(deserializer)?;
    Ok(table.map(|t| t.into_iter().map(|(k, _)| k).collect()).unwrap_or_default())
}

#[derive(Debug)]
pub struct BuildResources {
    workers: Arc<Semaphore>,
    installs: Arc<Semaphore>,
    parallelism: usize,
    manifests: Mutex<FxHashMap<PathBuf, Arc<DependencyManifest>>>,
}

impl BuildResources {
    /// Create resources allowing `parallelism` concurrent bundler jobs
    /// (defaults to the CPU count).
    pub fn new(parallelism: Option<usize>) -> Self {
        let parallelism = parallelism
            .filter(|n| *n > 0)
            .unwrap_or_else(num_cpus::get);
        debug!(parallelism, "created build resources");
        Self {
            workers: Arc::new(Semaphore::new(parallelism)),
            installs: Arc::new(Semaphore::new(1)),
            parallelism,
            manifests: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Wait for a worker slot. The slot is released when the permit drops.
    pub async fn acquire_worker(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)
    }

    /// Wait for the single install slot; installs never run concurrently.
    pub async fn acquire_install(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.installs)
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)
    }

    /// Find the manifest of `name` as Node would, walking `node_modules`
    /// directories upward from `from`.
    ///
    /// Only successful lookups are cached; a dependency installed mid-build
    /// is found on the next call.
    pub fn dependency_manifest(
        &self,
        name: &str,
        from: &Path,
    ) -> Result<Option<Arc<DependencyManifest>>> {
        for dir in from.ancestors() {
            let path = dir.join("node_modules").join(name).join("package.json");

            if let Some(cached) = self.manifests.lock().get(&path) {
                return Ok(Some(Arc::clone(cached)));
            }

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let mut manifest: DependencyManifest =
                serde_json::from_str(&content).map_err(|e| {
                    Error::Config(kiln_config::ConfigError::InvalidJson {
                        path: path.clone(),
                        message: e.to_string(),
                    })
                })?;
            manifest.directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
            if manifest.name.is_empty() {
                manifest.name = name.to_string();
            }

            let manifest = Arc::new(manifest);
            self.manifests.lock().insert(path, Arc::clone(&manifest));
            return Ok(Some(manifest));
        }

        Ok(None)
    }

    /// Close the pool. Tasks still waiting for a slot fail with
    /// [`Error::PoolClosed`].
    pub fn dispose(&self) {
        self.workers.close();
        self.installs.close();
        self.manifests.lock().clear();
        debug!("disposed build resources");
    }

    pub fn is_disposed(&self) -> bool {
        self.workers.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn dispose_closes_the_pool() {
        let resources = BuildResources::new(Some(2));
        assert_eq!(resources.parallelism(), 2);
        let permit = resources.acquire_worker().await.unwrap();
        drop(permit);

        resources.dispose();
        assert!(resources.is_disposed());
        assert!(matches!(
            resources.acquire_worker().await,
            Err(Error::PoolClosed)
        ));
    }

    #[test]
    fn dependency_manifest_walks_up_and_caches() {
        let dir = TempDir::new().unwrap();
        let dep = dir.path().join("node_modules/react-dom");
        fs::create_dir_all(&dep).unwrap();
        fs::write(
            dep.join("package.json"),
            r#"{"name": "react-dom", "dependencies": {"scheduler": "*"}, "peerDependencies": {"react": "*"}}"#,
        )
        .unwrap();
        let nested = dir.path().join("packages/a");
        fs::create_dir_all(&nested).unwrap();

        let resources = BuildResources::new(Some(1));
        let manifest = resources
            .dependency_manifest("react-dom", &nested)
            .unwrap()
            .unwrap();
        assert_eq!(manifest.dependencies, ["scheduler"]);
        assert_eq!(manifest.peer_dependencies, ["react"]);
        assert_eq!(manifest.directory, dep);

        fs::remove_dir_all(&dep).unwrap();
        assert!(
            resources
                .dependency_manifest("react-dom", &nested)
                .unwrap()
                .is_some()
        );
        assert!(
            resources
                .dependency_manifest("missing", &nested)
                .unwrap()
                .is_none()
        );
    }
}
