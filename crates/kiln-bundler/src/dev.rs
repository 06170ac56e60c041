//! Dev mode: `dist` files that point straight at the sources, so packages of
//! a monorepo can import each other without a build.

use std::path::PathBuf;

use kiln_config::{StrictEntrypoint, StrictPackage};
use tracing::info;

use crate::Result;
use crate::bundler::OutputFile;
use crate::other_files::{dts_redirect, flow_redirect, is_flow, source_import, source_import_stem};
use crate::writer::write_outputs;

/// Replace the `dist` directory of every entrypoint with redirect files.
pub fn write_dev_files(packages: &[StrictPackage]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for package in packages {
        for entry in package.entrypoints() {
            let files = redirects(entry)?;
            written.extend(write_outputs(&entry.dist_directory(), &files)?);
        }
        info!(package = %package.name(), "wrote dev redirects");
    }
    Ok(written)
}

fn redirects(entry: &StrictEntrypoint) -> Result<Vec<OutputFile>> {
    let source = std::fs::read_to_string(&entry.source)?;
    let has_default = source.contains("export default");
    let import = source_import(entry);

    let cjs = format!("'use strict';\n\nmodule.exports = require(\"{import}\");\n");
    let mut esm = format!("export * from \"{import}\";\n");
    if has_default {
        esm.push_str(&format!("export {{ default }} from \"{import}\";\n"));
    }

    let mut files = vec![OutputFile::new(entry.directory.join(&entry.main), cjs.clone())];
    if entry.module.is_some() {
        files.push(OutputFile::new(entry.output_path("esm.js"), esm.clone()));
    }
    if entry.browser {
        files.push(OutputFile::new(entry.output_path("browser.cjs.js"), cjs));
        if entry.module.is_some() {
            files.push(OutputFile::new(entry.output_path("browser.esm.js"), esm));
        }
    }
    if is_flow(&source) {
        files.push(flow_redirect(entry));
    }
    if entry.is_typescript() {
        files.push(dts_redirect(entry, &source_import_stem(entry), has_default));
    }

    Ok(files)
}
