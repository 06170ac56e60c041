//! Writing an entrypoint's files into its `dist` directory.
//!
//! All files of an entrypoint are written together: content goes to `.tmp`
//! siblings first and is renamed into place only once every write succeeded.
//! Paths are cleaned and must stay inside `dist`.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tracing::{debug, warn};

use crate::bundler::OutputFile;
use crate::{Error, Result};

/// Replace the contents of `dist` with `files`.
///
/// Returns the written paths in input order, source maps included.
pub fn write_outputs(dist: &Path, files: &[OutputFile]) -> Result<Vec<PathBuf>> {
    let dist = dist.clean();

    let mut operations = Vec::with_capacity(files.len());
    for file in files {
        let relative = file.path.strip_prefix(&dist).unwrap_or(&file.path);
        let target = validate_output_path(&dist, &relative.to_string_lossy())?;
        if let Some(map) = &file.map {
            let mut map_path = target.clone().into_os_string();
            map_path.push(".map");
            operations.push((PathBuf::from(map_path), map.as_bytes()));
        }
        operations.push((target, file.code.as_bytes()));
    }

    clean_directory(&dist)?;
    write_files_atomic(&operations)?;

    debug!(dist = %dist.display(), files = operations.len(), "wrote outputs");
    Ok(operations.into_iter().map(|(path, _)| path).collect())
}

/// Remove `dir` and everything in it. A missing directory is fine.
pub fn clean_directory(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::WriteFailure(format!(
            "Failed to clean '{}': {}",
            dir.display(),
            e
        ))),
    }
}

fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();

    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut temp_path = target_path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                warn!(path = %temp_path.display(), error = %e, "failed to clean up temporary file");
            }
        }
    }
}
