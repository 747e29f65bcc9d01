// crates/envlift-config/src/resources.rs
// ============================================================================
// Module: envlift Custom Resource Loader
// Description: Reads the on-disk custom resource set.
// Purpose: Build the resource set published before every environment upgrade.
// Dependencies: envlift-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each subdirectory of the resource directory is one custom resource named
//! after the directory; its handler source is `index.js`. Names must be valid
//! template logical identifiers. Files are bounded in size and read in name
//! order so content-addressed keys are stable across runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use envlift_core::CustomResource;
use envlift_core::NamedBinary;
use envlift_core::ResourceSet;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Handler file expected in every resource directory.
pub const HANDLER_FILE_NAME: &str = "index.js";
/// Maximum handler size in bytes.
const MAX_HANDLER_FILE_SIZE: u64 = 4 * 1024 * 1024;
/// Maximum number of resources in one set.
const MAX_RESOURCES: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Resource loading errors.
#[derive(Debug, Error)]
pub enum ResourceLoadError {
    /// A file or directory could not be read.
    #[error("read custom resources at {path}: {message}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// I/O failure.
        message: String,
    },
    /// The directory contents are not a valid resource set.
    #[error("invalid custom resource set: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Loads the custom resource set from `dir`.
///
/// # Errors
///
/// Returns [`ResourceLoadError`] when the directory cannot be read, a handler
/// is missing or oversized, or a resource name is not a logical identifier.
pub fn load_resource_set(dir: &Path) -> Result<ResourceSet, ResourceLoadError> {
    let io_error = |path: &Path, err: std::io::Error| ResourceLoadError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| io_error(dir, err))? {
        let entry = entry.map_err(|err| io_error(dir, err))?;
        let file_type = entry.file_type().map_err(|err| io_error(&entry.path(), err))?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name().to_str().map(str::to_string).ok_or_else(|| {
            ResourceLoadError::Invalid(format!(
                "resource directory name {} is not utf-8",
                entry.path().display()
            ))
        })?;
        if name.starts_with('.') {
            continue;
        }
        if !is_logical_name(&name) {
            return Err(ResourceLoadError::Invalid(format!(
                "resource name '{name}' must be alphanumeric and start with a letter"
            )));
        }
        names.push(name);
    }
    if names.len() > MAX_RESOURCES {
        return Err(ResourceLoadError::Invalid(format!(
            "{} resources exceed the limit of {MAX_RESOURCES}",
            names.len()
        )));
    }
    names.sort();

    let mut resources = Vec::with_capacity(names.len());
    for name in names {
        let handler = dir.join(&name).join(HANDLER_FILE_NAME);
        let size = fs::metadata(&handler).map_err(|err| io_error(&handler, err))?.len();
        if size > MAX_HANDLER_FILE_SIZE {
            return Err(ResourceLoadError::Invalid(format!(
                "{} exceeds size limit",
                handler.display()
            )));
        }
        let content = fs::read(&handler).map_err(|err| io_error(&handler, err))?;
        let files = vec![NamedBinary::new(HANDLER_FILE_NAME, content)];
        let resource = CustomResource::new(name, files);
        debug!(resource = %resource.logical_name, key = %resource.key, "loaded custom resource");
        resources.push(resource);
    }
    Ok(ResourceSet::new(resources))
}

/// Returns true for template logical identifiers.
fn is_logical_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_names_are_alphanumeric() {
        assert!(is_logical_name("DNSDelegation"));
        assert!(is_logical_name("Env1Controller"));
        assert!(!is_logical_name("1Bad"));
        assert!(!is_logical_name("dns-delegation"));
        assert!(!is_logical_name(""));
    }
}
