//! Files written next to the bundles: the `main` shim choosing between the
//! dev and prod builds, Flow and TypeScript redirects, and declarations.

use std::path::{Path, PathBuf};

use kiln_config::StrictEntrypoint;
use tracing::debug;

use crate::Result;
use crate::bundler::OutputFile;
use crate::dts::DeclarationGenerator;

const DECLARATIONS_DIR: &str = "declarations";

/// Build the non-bundle files of `entry`.
pub async fn other_files(
    package: &str,
    entry: &StrictEntrypoint,
    declarations: Option<&dyn DeclarationGenerator>,
) -> Result<Vec<OutputFile>> {
    let mut files = vec![OutputFile::new(
        entry.directory.join(&entry.main),
        env_switch(&entry.file_base),
    )];

    let source = tokio::fs::read_to_string(&entry.source).await?;
    if is_flow(&source) {
        files.push(flow_redirect(entry));
    }

    if entry.is_typescript() {
        match declarations {
            Some(generator) => files.extend(typescript_files(package, entry, generator).await?),
            None => debug!(package, entrypoint = %entry.name, "no declaration generator, skipping .d.ts"),
        }
    }

    Ok(files)
}

fn env_switch(file_base: &str) -> String {
    format!(
        "'use strict';\n\n\
         if (process.env.NODE_ENV === \"production\") {{\n  \
         module.exports = require(\"./{file_base}.cjs.prod.js\");\n\
         }} else {{\n  \
         module.exports = require(\"./{file_base}.cjs.dev.js\");\n\
         }}\n"
    )
}

pub(crate) fn is_flow(source: &str) -> bool {
    source.contains("@flow")
}

/// The entry source relative to `dist`, e.g. `../src/index.js`.
pub(crate) fn source_import(entry: &StrictEntrypoint) -> String {
    let relative = entry
        .source
        .strip_prefix(&entry.directory)
        .unwrap_or(&entry.source);
    format!("../{}", slashes(relative))
}

/// [`source_import`] without the file extension, as TypeScript resolves it.
pub(crate) fn source_import_stem(entry: &StrictEntrypoint) -> String {
    strip_extension(&source_import(entry))
}

pub(crate) fn flow_redirect(entry: &StrictEntrypoint) -> OutputFile {
    OutputFile::new(
        entry.output_path("cjs.js.flow"),
        format!("// @flow\nexport * from \"{}\";\n", source_import(entry)),
    )
}

pub(crate) fn dts_redirect(entry: &StrictEntrypoint, target: &str, has_default: bool) -> OutputFile {
    let mut code = format!("export * from \"{target}\";\n");
    if has_default {
        code.push_str(&format!("export {{ default }} from \"{target}\";\n"));
    }
    OutputFile::new(entry.output_path("cjs.d.ts"), code)
}

async fn typescript_files(
    package: &str,
    entry: &StrictEntrypoint,
    generator: &dyn DeclarationGenerator,
) -> Result<Vec<OutputFile>> {
    let declarations_dir = entry.dist_directory().join(DECLARATIONS_DIR);
    let source_root = entry.source.parent().unwrap_or(&entry.directory);

    let mut sources = typescript_sources(source_root)?;
    if !sources.contains(&entry.source) {
        sources.push(entry.source.clone());
    }

    let mut files = Vec::with_capacity(sources.len() + 1);
    let mut entry_has_default = false;
    for source in &sources {
        let declaration = generator.generate(package, source).await?;
        let relative = source.strip_prefix(&entry.directory).unwrap_or(source);
        let directory = relative.parent().unwrap_or(Path::new(""));
        if source == &entry.source {
            entry_has_default = declaration.has_default_export();
        }
        files.push(OutputFile::new(
            declarations_dir.join(directory).join(&declaration.name),
            declaration.content,
        ));
    }

    let relative = entry
        .source
        .strip_prefix(&entry.directory)
        .unwrap_or(&entry.source);
    let target = strip_extension(&format!("./{DECLARATIONS_DIR}/{}", slashes(relative)));
    files.push(dts_redirect(entry, &target, entry_has_default));

    debug!(package, entrypoint = %entry.name, declarations = sources.len(), "generated declarations");
    Ok(files)
}

/// TypeScript sources under `dir`, sorted, without `.d.ts` files.
fn typescript_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if path.is_dir() {
                if name != "node_modules" && name != "dist" && !name.starts_with('.') {
                    pending.push(path);
                }
            } else if (name.ends_with(".ts") || name.ends_with(".tsx")) && !name.ends_with(".d.ts") {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_extension(import: &str) -> String {
    match import.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') && !stem.ends_with('.') && !stem.is_empty() => {
            stem.to_string()
        }
        _ => import.to_string(),
    }
}
