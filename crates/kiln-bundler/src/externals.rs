//! Which imports stay external in a build variant.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use kiln_config::Manifest;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::resources::BuildResources;
use crate::target::{RuntimeEnvironment, is_node_builtin};
use crate::{Error, Result};

/// Dependencies whose manifest may legitimately be missing: older installs
/// resolved them through a helper path rather than a real package.
pub const UNRESOLVABLE_SKIP_LIST: &[&str] = &["@babel/runtime"];

/// The external predicate of one build variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Externals {
    packages: FxHashSet<String>,
    node_builtins: bool,
}

impl Externals {
    pub fn new(packages: impl IntoIterator<Item = String>, node_builtins: bool) -> Self {
        Self {
            packages: packages.into_iter().collect(),
            node_builtins,
        }
    }

    /// Whether `specifier` is left as an import in the output.
    /// Subpaths match by package name: `react/jsx-runtime` is external when `react` is.
    pub fn is_external(&self, specifier: &str) -> bool {
        if self.node_builtins && is_node_builtin(specifier) {
            return true;
        }
        package_name(specifier).is_some_and(|name| self.packages.contains(name))
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(String::as_str)
    }
}

/// Package name of a bare specifier: `@scope/pkg/sub` gives `@scope/pkg`,
/// `pkg/sub` gives `pkg`. Relative and absolute specifiers give `None`.
pub fn package_name(specifier: &str) -> Option<&str> {
    if !is_bare(specifier) {
        return None;
    }
    let mut parts = specifier.splitn(3, '/');
    let first = parts.next()?;
    if first.starts_with('@') {
        let second = parts.next()?;
        Some(&specifier[..first.len() + 1 + second.len()])
    } else {
        Some(first)
    }
}

pub fn is_bare(specifier: &str) -> bool {
    !(specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with('\0')
        || Path::new(specifier).is_absolute())
}

/// Compute the externals of a variant targeting `environment`.
///
/// Node variants keep dependencies, peer dependencies, their transitive peer
/// dependencies and built-ins external. UMD bundles its dependencies, so only
/// peer dependencies (its own and those found anywhere in its dependency
/// tree) stay external.
pub fn compute_externals(
    package: &str,
    manifest: &Manifest,
    environment: RuntimeEnvironment,
    umd: bool,
    resources: &BuildResources,
) -> Result<Externals> {
    let dependencies: Vec<String> = manifest.dependencies().into_iter().map(str::to_string).collect();
    let peers: Vec<String> = manifest
        .peer_dependencies()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut external: FxHashSet<String> = peers.iter().cloned().collect();
    let walk = if umd {
        PeerWalk {
            roots: dependencies,
            follow_dependencies: true,
        }
    } else {
        external.extend(dependencies.iter().cloned());
        PeerWalk {
            roots: dependencies.into_iter().chain(peers).collect(),
            follow_dependencies: false,
        }
    };

    external.extend(walk.run(package, manifest.directory(), resources)?);
    debug!(
        package,
        umd,
        count = external.len(),
        "computed externals"
    );

    Ok(Externals::new(
        external,
        environment.externalizes_builtins(),
    ))
}

struct PeerWalk {
    roots: Vec<String>,
    /// Also descend into `dependencies`, not just `peerDependencies`.
    follow_dependencies: bool,
}

impl PeerWalk {
    fn run(self, package: &str, from: &Path, resources: &BuildResources) -> Result<FxHashSet<String>> {
        let mut peers = FxHashSet::default();
        let mut visited = FxHashSet::default();
        let mut queue: VecDeque<(String, PathBuf)> = self
            .roots
            .into_iter()
            .map(|name| (name, from.to_path_buf()))
            .collect();

        while let Some((name, from)) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }

            let Some(manifest) = resources.dependency_manifest(&name, &from)? else {
                if UNRESOLVABLE_SKIP_LIST.contains(&name.as_str()) {
                    debug!(package, dependency = %name, "skipping unresolvable dependency");
                    continue;
                }
                return Err(Error::DependencyManifestNotFound {
                    package: package.to_string(),
                    dependency: name,
                });
            };

            for peer in &manifest.peer_dependencies {
                peers.insert(peer.clone());
                queue.push_back((peer.clone(), manifest.directory.clone()));
            }
            if self.follow_dependencies {
                for dep in &manifest.dependencies {
                    queue.push_back((dep.clone(), manifest.directory.clone()));
                }
            }
        }

        Ok(peers)
    }
}
