//! Build coordinator tests against a mock bundler

mod helpers;

use helpers::*;
use kiln_bundler::{BuildCoordinator, BuildResources, Error, Variant};
use kiln_config::{AlwaysConfirm, Decision, Question, resolve_project};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn coordinator(
    bundler: Arc<MockBundler>,
    decision: Arc<dyn Decision>,
    installer: Arc<MockInstaller>,
) -> BuildCoordinator {
    BuildCoordinator::new(
        bundler,
        decision,
        installer,
        Arc::new(BuildResources::new(Some(2))),
    )
}

fn package(dir: &Path, manifest: &str, source: &str) {
    write(&dir.join("package.json"), manifest);
    write(&dir.join("src/index.js"), source);
}

const OBJECT_ASSIGN_SOURCE: &str =
    "import objectAssign from \"object-assign\";\nexport default objectAssign({}, {});\n";

#[tokio::test]
async fn missing_object_assign_is_installed_when_accepted() {
    let dir = TempDir::new().unwrap();
    package(
        dir.path(),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js"}"#,
        OBJECT_ASSIGN_SOURCE,
    );

    let bundler = Arc::new(MockBundler::default());
    let decision = Arc::new(RecordingDecision::new(true));
    let installer = Arc::new(MockInstaller::default());
    let project = resolve_project(dir.path()).unwrap();

    let report = coordinator(Arc::clone(&bundler), decision.clone(), Arc::clone(&installer))
        .build(project.into_packages())
        .await
        .unwrap();

    assert_eq!(
        decision.questions(),
        [Question::InstallDependency {
            package: "pkg".to_string(),
            dependency: "object-assign".to_string(),
        }]
    );
    let requests = installer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].packages, ["object-assign"]);
    assert_eq!(requests[0].cwd, dir.path());

    assert!(read_manifest(dir.path())["dependencies"]["object-assign"].is_string());
    assert_eq!(
        dist_files(&dir.path().join("dist")),
        ["pkg.cjs.dev.js", "pkg.cjs.js", "pkg.cjs.prod.js"]
    );
    assert_eq!(report.files.len(), 3);
    // The first dev attempt stopped at the question, the retry built both variants.
    assert_eq!(
        bundler.calls(),
        [
            ("pkg".to_string(), Variant::NodeDev),
            ("pkg".to_string(), Variant::NodeDev),
            ("pkg".to_string(), Variant::NodeProd),
        ]
    );
}

#[tokio::test]
async fn declining_the_install_fails_with_the_package_name() {
    let dir = TempDir::new().unwrap();
    package(
        dir.path(),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js"}"#,
        OBJECT_ASSIGN_SOURCE,
    );

    let installer = Arc::new(MockInstaller::default());
    let project = resolve_project(dir.path()).unwrap();
    let err = coordinator(
        Arc::new(MockBundler::default()),
        Arc::new(RecordingDecision::new(false)),
        Arc::clone(&installer),
    )
    .build(project.into_packages())
    .await
    .unwrap_err();

    assert!(matches!(err, Error::MissingDependency { .. }));
    let message = err.to_string();
    assert!(message.contains("pkg"));
    assert!(message.contains("object-assign"));
    assert!(installer.requests().is_empty());
    assert!(!dir.path().join("dist").exists());
}

#[tokio::test]
async fn babel_helpers_install_babel_runtime() {
    let dir = TempDir::new().unwrap();
    package(
        dir.path(),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js"}"#,
        "import _extends from \"@babel/runtime/helpers/extends\";\nexport default _extends;\n",
    );

    let installer = Arc::new(MockInstaller::default());
    let project = resolve_project(dir.path()).unwrap();
    coordinator(
        Arc::new(MockBundler::default()),
        Arc::new(AlwaysConfirm),
        Arc::clone(&installer),
    )
    .build(project.into_packages())
    .await
    .unwrap();

    assert_eq!(installer.requests()[0].packages, ["@babel/runtime"]);
}

#[tokio::test]
async fn entrypoints_sharing_a_missing_dependency_ask_once() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("package.json"),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js", "kiln": {"entrypoints": [".", "b"]}}"#,
    );
    write(&dir.path().join("src/index.js"), OBJECT_ASSIGN_SOURCE);
    write(&dir.path().join("b/package.json"), r#"{"main": "dist/pkg.cjs.js"}"#);
    write(&dir.path().join("b/src/index.js"), OBJECT_ASSIGN_SOURCE);

    let decision = Arc::new(AcceptOnce::default());
    let installer = Arc::new(MockInstaller::default());
    let project = resolve_project(dir.path()).unwrap();
    coordinator(
        Arc::new(MockBundler::default()),
        decision.clone(),
        Arc::clone(&installer),
    )
    .build(project.into_packages())
    .await
    .unwrap();

    assert_eq!(decision.questions().len(), 1);
    assert_eq!(installer.requests().len(), 1);
    assert!(dir.path().join("dist/pkg.cjs.dev.js").exists());
    assert!(dir.path().join("b/dist/pkg.cjs.dev.js").exists());
}

#[tokio::test]
async fn installs_never_run_concurrently() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("package.json"),
        r#"{"name": "root", "private": true, "kiln": {"packages": ["packages/*"]}}"#,
    );
    for name in ["one", "two"] {
        package(
            &dir.path().join("packages").join(name),
            &format!(r#"{{"name": "{name}", "main": "dist/{name}.cjs.js"}}"#),
            OBJECT_ASSIGN_SOURCE,
        );
    }

    let installer = Arc::new(MockInstaller::slow(Duration::from_millis(50)));
    let project = resolve_project(dir.path()).unwrap();
    coordinator(
        Arc::new(MockBundler::default()),
        Arc::new(AlwaysConfirm),
        Arc::clone(&installer),
    )
    .build(project.into_packages())
    .await
    .unwrap();

    assert_eq!(installer.requests().len(), 2);
    assert_eq!(installer.peak_concurrency(), 1);
}

const BROWSER_SOURCE: &str =
    "export const isBrowser = typeof window !== \"undefined\";\nexport default isBrowser;\n";

fn browser_package(dir: &Path) {
    write(
        &dir.join("package.json"),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js", "kiln": {"entrypoints": [".", "multiply"]}}"#,
    );
    write(&dir.join("src/index.js"), BROWSER_SOURCE);
    write(
        &dir.join("multiply/package.json"),
        r#"{"main": "dist/pkg.cjs.js"}"#,
    );
    write(&dir.join("multiply/src/index.js"), BROWSER_SOURCE);
}

#[tokio::test]
async fn browser_globals_ask_once_and_add_the_browser_field() {
    let dir = TempDir::new().unwrap();
    browser_package(dir.path());

    let decision = Arc::new(RecordingDecision::new(true));
    let project = resolve_project(dir.path()).unwrap();
    coordinator(
        Arc::new(MockBundler::default()),
        decision.clone(),
        Arc::new(MockInstaller::default()),
    )
    .build(project.into_packages())
    .await
    .unwrap();

    assert_eq!(
        decision.questions(),
        [Question::BrowserField {
            package: "pkg".to_string()
        }]
    );

    let manifest = read_manifest(dir.path());
    assert_eq!(
        manifest["browser"]["./dist/pkg.cjs.js"],
        "./dist/pkg.browser.cjs.js"
    );
    let entrypoint_manifest = read_manifest(&dir.path().join("multiply"));
    assert_eq!(
        entrypoint_manifest["browser"]["./dist/pkg.cjs.js"],
        "./dist/pkg.browser.cjs.js"
    );

    let browser_build =
        fs::read_to_string(dir.path().join("dist/pkg.browser.cjs.js")).unwrap();
    assert!(browser_build.contains("\"object\" !== \"undefined\""));
    assert!(dir.path().join("multiply/dist/pkg.browser.cjs.js").exists());
}

#[tokio::test]
async fn declining_the_browser_field_fails() {
    let dir = TempDir::new().unwrap();
    browser_package(dir.path());

    let decision = Arc::new(RecordingDecision::new(false));
    let project = resolve_project(dir.path()).unwrap();
    let err = coordinator(
        Arc::new(MockBundler::default()),
        decision.clone(),
        Arc::new(MockInstaller::default()),
    )
    .build(project.into_packages())
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::BrowserGlobalsWithoutBrowserField { ref package } if package == "pkg"
    ));
    assert_eq!(decision.questions().len(), 1);
    assert!(read_manifest(dir.path()).get("browser").is_none());
}

#[tokio::test]
async fn scoped_package_builds_end_to_end() {
    let dir = TempDir::new().unwrap();
    package(
        dir.path(),
        r#"{
  "name": "@some-scope/some-package",
  "main": "dist/some-package.cjs.js",
  "module": "dist/some-package.esm.js"
}"#,
        "// @flow\nexport default \"something\";\n",
    );

    let project = resolve_project(dir.path()).unwrap();
    let report = coordinator(
        Arc::new(MockBundler::default()),
        Arc::new(AlwaysConfirm),
        Arc::new(MockInstaller::default()),
    )
    .build(project.into_packages())
    .await
    .unwrap();

    assert_eq!(report.packages, 1);
    assert_eq!(report.entrypoints, 1);
    assert_eq!(
        dist_files(&dir.path().join("dist")),
        [
            "some-package.cjs.dev.js",
            "some-package.cjs.js",
            "some-package.cjs.js.flow",
            "some-package.cjs.prod.js",
            "some-package.esm.js",
        ]
    );

    let shim = fs::read_to_string(dir.path().join("dist/some-package.cjs.js")).unwrap();
    assert!(shim.contains("require(\"./some-package.cjs.prod.js\")"));
    assert_eq!(read_manifest(dir.path())["name"], "@some-scope/some-package");
}

#[tokio::test]
async fn production_build_inlines_node_env() {
    let dir = TempDir::new().unwrap();
    package(
        dir.path(),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js"}"#,
        "export const dev = process.env.NODE_ENV !== \"production\";\n",
    );

    let project = resolve_project(dir.path()).unwrap();
    coordinator(
        Arc::new(MockBundler::default()),
        Arc::new(AlwaysConfirm),
        Arc::new(MockInstaller::default()),
    )
    .build(project.into_packages())
    .await
    .unwrap();

    let prod = fs::read_to_string(dir.path().join("dist/pkg.cjs.prod.js")).unwrap();
    assert!(prod.contains("\"production\" !== \"production\""));
    let dev = fs::read_to_string(dir.path().join("dist/pkg.cjs.dev.js")).unwrap();
    assert!(dev.contains("process.env.NODE_ENV"));
}

#[tokio::test]
async fn undeclared_import_fails_the_whole_build() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("package.json"),
        r#"{"name": "root", "private": true, "kiln": {"packages": ["packages/*"]}}"#,
    );
    package(
        &dir.path().join("packages/good"),
        r#"{"name": "good", "main": "dist/good.cjs.js"}"#,
        "export default 1;\n",
    );
    package(
        &dir.path().join("packages/bad"),
        r#"{"name": "bad", "main": "dist/bad.cjs.js"}"#,
        "import get from \"lodash.get\";\nexport default get;\n",
    );

    let decision = Arc::new(RecordingDecision::new(true));
    let project = resolve_project(dir.path()).unwrap();
    let err = coordinator(
        Arc::new(MockBundler::default()),
        decision.clone(),
        Arc::new(MockInstaller::default()),
    )
    .build(project.into_packages())
    .await
    .unwrap_err();

    match &err {
        Error::UndeclaredDependency {
            package, specifier, ..
        } => {
            assert_eq!(package, "bad");
            assert_eq!(specifier, "lodash.get");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("is not specified in dependencies or peerDependencies"));
    assert!(decision.questions().is_empty());
    assert!(!dir.path().join("packages/bad/dist").exists());
}

#[tokio::test]
async fn relative_import_outside_package_is_fatal() {
    let dir = TempDir::new().unwrap();
    package(
        &dir.path().join("pkg"),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js"}"#,
        "export * from \"../../shared/index.js\";\n",
    );

    let project = resolve_project(dir.path().join("pkg")).unwrap();
    let err = coordinator(
        Arc::new(MockBundler::default()),
        Arc::new(AlwaysConfirm),
        Arc::new(MockInstaller::default()),
    )
    .build(project.into_packages())
    .await
    .unwrap_err();

    assert!(matches!(err, Error::ImportOutsidePackage { ref package, .. } if package == "pkg"));
}

#[tokio::test]
async fn invalid_manifest_is_reported_before_building() {
    let dir = TempDir::new().unwrap();
    package(
        dir.path(),
        r#"{"name": "pkg", "main": "index.js"}"#,
        "export default 1;\n",
    );

    let bundler = Arc::new(MockBundler::default());
    let project = resolve_project(dir.path()).unwrap();
    let err = coordinator(
        Arc::clone(&bundler),
        Arc::new(AlwaysConfirm),
        Arc::new(MockInstaller::default()),
    )
    .build(project.into_packages())
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.package(), Some("pkg"));
    assert!(bundler.calls().is_empty());
}
