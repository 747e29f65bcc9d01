// crates/envlift-core/src/runtime/publisher.rs
// ============================================================================
// Module: envlift Artifact Publisher
// Description: Uploads custom resources and collects their URLs.
// Purpose: Aggregate per-resource uploads into the URL map an upgrade consumes.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Packaging and upload are delegated to a caller-supplied callback, usually
//! bound to an environment-scoped [`crate::interfaces::ObjectStore`]. The
//! first failed upload aborts the whole publish; no partial map is returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::core::NamedBinary;
use crate::core::ResourceSet;
use crate::interfaces::ObjectStoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Publish errors.
#[derive(Debug, Error)]
#[error("upload custom resource {logical_name}: {source}")]
pub struct PublishError {
    /// Logical name of the resource that failed.
    pub logical_name: String,
    /// Upload failure.
    pub source: ObjectStoreError,
}

// ============================================================================
// SECTION: Publishing
// ============================================================================

/// Uploads every resource and returns URLs keyed by logical name.
///
/// # Errors
///
/// Returns [`PublishError`] for the first resource whose upload fails.
pub fn publish<F>(
    resources: &ResourceSet,
    mut upload: F,
) -> Result<BTreeMap<String, String>, PublishError>
where
    F: FnMut(&str, &[NamedBinary]) -> Result<String, ObjectStoreError>,
{
    let mut urls = BTreeMap::new();
    for resource in &resources.resources {
        let url = upload(&resource.key, &resource.files).map_err(|source| PublishError {
            logical_name: resource.logical_name.clone(),
            source,
        })?;
        debug!(resource = %resource.logical_name, url = %url, "uploaded custom resource");
        urls.insert(resource.logical_name.clone(), url);
    }
    Ok(urls)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;
    use crate::core::CustomResource;

    fn resources() -> ResourceSet {
        ResourceSet::new(vec![
            CustomResource::new("CustomDomainFunction", vec![NamedBinary::new("index.js", "a")]),
            CustomResource::new("DNSDelegationFunction", vec![NamedBinary::new("index.js", "b")]),
        ])
    }

    #[test]
    fn urls_are_keyed_by_logical_name() {
        let urls =
            publish(&resources(), |key, _| Ok(format!("https://bucket/{key}"))).expect("publish");
        assert_eq!(urls.len(), 2);
        assert!(urls["DNSDelegationFunction"].contains("dnsdelegationfunction"));
    }

    #[test]
    fn first_failure_aborts() {
        let mut calls = 0;
        let err = publish(&resources(), |key, _| {
            calls += 1;
            Err(ObjectStoreError::Upload {
                bucket: "bucket".to_string(),
                key: key.to_string(),
                message: "denied".to_string(),
            })
        })
        .expect_err("publish fails");
        assert_eq!(err.logical_name, "CustomDomainFunction");
        assert_eq!(calls, 1);
    }
}
