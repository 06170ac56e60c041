//! Tests for the init and fix flows

use async_trait::async_trait;
use kiln_config::{
    AlwaysConfirm, ConfigError, Decision, Field, Manifest, NeverConfirm, Question, fix, init,
    resolve_project,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Records every question and answers with a fixed value, except `main`
/// which is always accepted unless `decline_main` is set.
#[derive(Default)]
struct RecordingDecision {
    answer: bool,
    decline_main: bool,
    questions: Mutex<Vec<Question>>,
}

impl RecordingDecision {
    fn new(answer: bool) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }

    fn questions(&self) -> Vec<Question> {
        self.questions.lock().clone()
    }
}

#[async_trait]
impl Decision for RecordingDecision {
    async fn confirm(&self, question: &Question) -> kiln_config::Result<bool> {
        self.questions.lock().push(question.clone());
        if let Question::FixField {
            field: Field::Main, ..
        } = question
        {
            return Ok(!self.decline_main);
        }
        Ok(self.answer)
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn read_manifest(dir: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(dir.join("package.json")).unwrap()).unwrap()
}

fn single_package(dir: &Path, manifest: &str, source: &str) {
    write(&dir.join("package.json"), manifest);
    write(&dir.join("src").join(source), "export const x = 1;\n");
}

#[tokio::test]
async fn init_sets_main_and_module_for_scoped_package() {
    let dir = TempDir::new().unwrap();
    single_package(
        dir.path(),
        r#"{"name": "@some-scope/some-package", "version": "1.0.0", "license": "MIT"}"#,
        "index.js",
    );

    let mut project = resolve_project(dir.path()).unwrap();
    let report = init(&mut project, &AlwaysConfirm).await.unwrap();
    assert_eq!(report.saved_packages, ["@some-scope/some-package"]);

    let manifest = read_manifest(dir.path());
    assert_eq!(manifest["name"], "@some-scope/some-package");
    assert_eq!(manifest["main"], "dist/some-package.cjs.js");
    assert_eq!(manifest["module"], "dist/some-package.esm.js");
    assert!(manifest.get("types").is_none());

    let keys: Vec<_> = manifest.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["name", "version", "main", "module", "license"]);
}

#[tokio::test]
async fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    single_package(dir.path(), r#"{"name": "pkg"}"#, "index.ts");

    let mut project = resolve_project(dir.path()).unwrap();
    init(&mut project, &AlwaysConfirm).await.unwrap();
    let first = fs::read_to_string(dir.path().join("package.json")).unwrap();

    let decision = RecordingDecision::new(true);
    let mut project = resolve_project(dir.path()).unwrap();
    let report = init(&mut project, &decision).await.unwrap();

    assert!(decision.questions().is_empty());
    assert!(report.is_empty());
    assert_eq!(
        fs::read_to_string(dir.path().join("package.json")).unwrap(),
        first
    );
}

#[tokio::test]
async fn declined_optional_fields_are_not_written() {
    let dir = TempDir::new().unwrap();
    single_package(dir.path(), r#"{"name": "pkg"}"#, "index.ts");

    let decision = RecordingDecision::new(false);
    let mut project = resolve_project(dir.path()).unwrap();
    init(&mut project, &decision).await.unwrap();

    let fields: Vec<_> = decision
        .questions()
        .into_iter()
        .filter_map(|q| match q {
            Question::FixField { field, .. } => Some(field),
            _ => None,
        })
        .collect();
    assert_eq!(fields, [Field::Main, Field::Module, Field::Types]);

    let manifest = read_manifest(dir.path());
    assert_eq!(manifest["main"], "dist/pkg.cjs.js");
    assert!(manifest.get("module").is_none());
    assert!(manifest.get("types").is_none());
}

#[tokio::test]
async fn declining_main_is_fatal_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let original = r#"{"name": "pkg"}"#;
    single_package(dir.path(), original, "index.js");

    let decision = RecordingDecision {
        decline_main: true,
        ..RecordingDecision::default()
    };
    let mut project = resolve_project(dir.path()).unwrap();
    let err = init(&mut project, &decision).await.unwrap_err();

    assert!(matches!(err, ConfigError::MainFieldDeclined { ref package } if package == "pkg"));
    assert_eq!(
        fs::read_to_string(dir.path().join("package.json")).unwrap(),
        original
    );
}

#[tokio::test]
async fn monorepo_asks_main_per_package_and_postinstall_once() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        &root.join("package.json"),
        r#"{"name": "root", "private": true, "kiln": {"packages": ["packages/*"]}}"#,
    );
    for name in ["one", "two", "three"] {
        single_package(
            &root.join("packages").join(name),
            &format!(r#"{{"name": "@repo/{name}"}}"#),
            "index.js",
        );
    }

    let decision = RecordingDecision::new(false);
    let mut project = resolve_project(root).unwrap();
    let report = init(&mut project, &decision).await.unwrap();

    let questions = decision.questions();
    let mains = questions
        .iter()
        .filter(|q| matches!(q, Question::FixField { field: Field::Main, .. }))
        .count();
    let postinstalls = questions
        .iter()
        .filter(|q| matches!(q, Question::Postinstall { .. }))
        .count();
    assert_eq!(mains, 3);
    assert_eq!(postinstalls, 1);
    assert!(matches!(questions.last(), Some(Question::Postinstall { .. })));
    assert!(!report.postinstall_added);
    assert!(read_manifest(root).get("scripts").is_none());
}

#[tokio::test]
async fn monorepo_postinstall_is_added_when_accepted() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        &root.join("package.json"),
        r#"{"name": "root", "private": true, "kiln": {"packages": ["packages/*"]}}"#,
    );
    single_package(
        &root.join("packages/a"),
        r#"{"name": "a", "main": "dist/a.cjs.js", "module": "dist/a.esm.js"}"#,
        "index.js",
    );

    let mut project = resolve_project(root).unwrap();
    let report = init(&mut project, &AlwaysConfirm).await.unwrap();
    assert!(report.postinstall_added);
    assert_eq!(read_manifest(root)["scripts"]["postinstall"], "kiln dev");
}

#[tokio::test]
async fn single_package_is_not_asked_about_postinstall() {
    let dir = TempDir::new().unwrap();
    single_package(dir.path(), r#"{"name": "pkg"}"#, "index.js");

    let decision = RecordingDecision::new(true);
    let mut project = resolve_project(dir.path()).unwrap();
    init(&mut project, &decision).await.unwrap();

    assert!(
        !decision
            .questions()
            .iter()
            .any(|q| matches!(q, Question::Postinstall { .. }))
    );
}

#[tokio::test]
async fn invalid_browser_field_is_replaced() {
    let dir = TempDir::new().unwrap();
    single_package(
        dir.path(),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js", "module": "dist/pkg.esm.js", "browser": {"./index.js": "./browser.js"}}"#,
        "index.js",
    );

    let mut project = resolve_project(dir.path()).unwrap();
    init(&mut project, &AlwaysConfirm).await.unwrap();

    let manifest = read_manifest(dir.path());
    assert_eq!(
        manifest["browser"],
        serde_json::json!({
            "./dist/pkg.cjs.js": "./dist/pkg.browser.cjs.js",
            "./dist/pkg.esm.js": "./dist/pkg.browser.esm.js"
        })
    );
}

#[tokio::test]
async fn umd_main_without_umd_name_fails() {
    let dir = TempDir::new().unwrap();
    single_package(
        dir.path(),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js", "umd:main": "dist/pkg.umd.min.js"}"#,
        "index.js",
    );

    let mut project = resolve_project(dir.path()).unwrap();
    let err = init(&mut project, &NeverConfirm).await.unwrap_err();
    assert!(matches!(err, ConfigError::UmdNameNotSpecified { .. }));
}

#[tokio::test]
async fn fix_repairs_without_adding_optional_fields() {
    let dir = TempDir::new().unwrap();
    single_package(
        dir.path(),
        r#"{"name": "pkg", "main": "index.js", "types": "index.d.ts"}"#,
        "index.ts",
    );

    let mut project = resolve_project(dir.path()).unwrap();
    let report = fix(&mut project).await.unwrap();
    assert_eq!(report.fixed.len(), 2);

    let manifest = Manifest::load(dir.path()).unwrap();
    assert_eq!(manifest.string_field("main"), Some("dist/pkg.cjs.js"));
    assert_eq!(manifest.string_field("types"), Some("dist/pkg.cjs.d.ts"));
    assert_eq!(manifest.field("module"), None);
}

#[tokio::test]
async fn entrypoint_fields_live_in_entrypoint_manifest() {
    let dir = TempDir::new().unwrap();
    single_package(
        dir.path(),
        r#"{"name": "@s/pkg", "kiln": {"entrypoints": [".", "multiply"]}}"#,
        "index.js",
    );
    write(&dir.path().join("multiply/package.json"), "{}");
    write(&dir.path().join("multiply/src/index.js"), "");

    let mut project = resolve_project(dir.path()).unwrap();
    init(&mut project, &AlwaysConfirm).await.unwrap();

    let entry = read_manifest(&dir.path().join("multiply"));
    assert_eq!(entry["main"], "dist/pkg.cjs.js");
    assert_eq!(entry["module"], "dist/pkg.esm.js");
    assert_eq!(read_manifest(dir.path())["main"], "dist/pkg.cjs.js");
}
