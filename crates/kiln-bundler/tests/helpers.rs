//! Shared test utilities for kiln-bundler tests
//!
//! The mock bundler stands in for Rolldown: it copies the entry source into
//! each output and reports imports the way the resolve plugin does.

#![allow(dead_code)]

use async_trait::async_trait;
use kiln_bundler::{
    Bundle, BundleWarning, Bundler, BuildVariantConfig, GeneratedOutput, InstallRequest,
    OutputDescriptor, OutputFile, PackageInstaller, Variant, WarningKind,
};
use kiln_config::{Decision, Question};
use parking_lot::Mutex;
use path_clean::PathClean;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn read_manifest(dir: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(dir.join("package.json")).unwrap()).unwrap()
}

/// Quoted specifiers following `from ` or `require(` in `source`.
pub fn imports(source: &str) -> Vec<String> {
    let mut found = Vec::new();
    for marker in ["from \"", "require(\""] {
        let mut rest = source;
        while let Some(start) = rest.find(marker) {
            rest = &rest[start + marker.len()..];
            if let Some(end) = rest.find('"') {
                found.push(rest[..end].to_string());
                rest = &rest[end..];
            }
        }
    }
    found
}

#[derive(Default)]
pub struct MockBundler {
    pub calls: Mutex<Vec<(String, Variant)>>,
}

impl MockBundler {
    pub fn calls(&self) -> Vec<(String, Variant)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Bundler for MockBundler {
    async fn bundle(&self, config: &BuildVariantConfig) -> kiln_bundler::Result<Box<dyn Bundle>> {
        self.calls
            .lock()
            .push((config.package.clone(), config.variant));
        let source = fs::read_to_string(&config.input)?;
        Ok(Box::new(MockBundle {
            config: config.clone(),
            source,
        }))
    }
}

struct MockBundle {
    config: BuildVariantConfig,
    source: String,
}

#[async_trait]
impl Bundle for MockBundle {
    async fn generate(&mut self, output: &OutputDescriptor) -> kiln_bundler::Result<GeneratedOutput> {
        let config = &self.config;
        let importer = config.input.to_string_lossy().into_owned();
        let mut warnings = Vec::new();

        for specifier in imports(&self.source) {
            if specifier.starts_with('.') {
                let base = config.input.parent().unwrap();
                let resolved = base.join(&specifier).clean();
                if !resolved.starts_with(&config.package_directory) {
                    warnings.push(BundleWarning {
                        kind: WarningKind::ImportOutsidePackage,
                        message: format!("{specifier} is outside the package"),
                        specifier: Some(specifier.clone()),
                        importer: Some(importer.clone()),
                    });
                }
                continue;
            }
            let own_entrypoint = config.aliases.contains_key(&specifier);
            let bundled = config.bundled_dependencies.contains(&specifier);
            if !own_entrypoint && !bundled && !config.externals.is_external(&specifier) {
                warnings.push(BundleWarning::unresolved_import(&specifier, &importer));
            }
        }

        warnings.push(BundleWarning {
            kind: WarningKind::CircularDependency,
            message: "a -> b -> a".to_string(),
            specifier: None,
            importer: None,
        });

        Ok(GeneratedOutput {
            files: vec![OutputFile::new(
                output.file.clone(),
                config.apply_replacements(&self.source),
            )],
            warnings,
        })
    }
}

/// Declares the requested packages in the manifest and creates their
/// `node_modules` entries, like a real install.
#[derive(Default)]
pub struct MockInstaller {
    pub requests: Mutex<Vec<InstallRequest>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockInstaller {
    /// An installer that takes `delay` per install.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<InstallRequest> {
        self.requests.lock().clone()
    }

    /// Most installs that ever ran at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageInstaller for MockInstaller {
    async fn install(&self, request: &InstallRequest) -> kiln_bundler::Result<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut manifest = read_manifest(&request.cwd);
        let dependencies = manifest
            .as_object_mut()
            .unwrap()
            .entry("dependencies")
            .or_insert_with(|| Value::Object(Default::default()));
        for package in &request.packages {
            dependencies[package.as_str()] = Value::String("^1.0.0".to_string());
            write(
                &request.cwd.join("node_modules").join(package).join("package.json"),
                &format!(r#"{{"name": "{package}"}}"#),
            );
        }
        write(
            &request.cwd.join("package.json"),
            &serde_json::to_string_pretty(&manifest).unwrap(),
        );

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every question and answers with a fixed value.
pub struct RecordingDecision {
    answer: bool,
    questions: Mutex<Vec<Question>>,
}

impl RecordingDecision {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<Question> {
        self.questions.lock().clone()
    }
}

#[async_trait]
impl Decision for RecordingDecision {
    async fn confirm(&self, question: &Question) -> kiln_config::Result<bool> {
        self.questions.lock().push(question.clone());
        Ok(self.answer)
    }
}

/// Takes a while to answer, says yes to the first question and no to the rest.
#[derive(Default)]
pub struct AcceptOnce {
    questions: Mutex<Vec<Question>>,
}

impl AcceptOnce {
    pub fn questions(&self) -> Vec<Question> {
        self.questions.lock().clone()
    }
}

#[async_trait]
impl Decision for AcceptOnce {
    async fn confirm(&self, question: &Question) -> kiln_config::Result<bool> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut questions = self.questions.lock();
        questions.push(question.clone());
        Ok(questions.len() == 1)
    }
}

pub fn dist_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn path(dir: &Path, relative: &str) -> PathBuf {
    dir.join(relative)
}
