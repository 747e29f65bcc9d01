// crates/envlift-core/src/core/upgrade_input.rs
// ============================================================================
// Module: envlift Upgrade Inputs
// Description: Parameter sets for regenerating environment templates.
// Purpose: Carry everything a stack upgrade needs, built fresh per environment.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! An [`UpgradeInput`] is assembled for exactly one environment and one target
//! version. Artifact-store addresses come from regional resource discovery,
//! custom-resource URLs from the artifact publisher, and customizations from
//! the environment record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::core::identifiers::AppName;
use crate::core::identifiers::EnvName;
use crate::core::records::NetworkOverride;
use crate::core::records::Telemetry;
use crate::core::version::TemplateVersion;

// ============================================================================
// SECTION: Artifact Store
// ============================================================================

/// Object key prefix for uploaded custom resources.
pub const CUSTOM_RESOURCE_KEY_PREFIX: &str = "custom-resources";

/// Default ARN partition.
pub const DEFAULT_PARTITION: &str = "aws";

/// Regional artifact bucket discovered for an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactBucket {
    /// Bucket name.
    pub name: String,
    /// Encryption key ARN protecting the bucket, when one is configured.
    pub kms_key_arn: Option<String>,
}

impl ArtifactBucket {
    /// Returns the bucket ARN in the given partition.
    #[must_use]
    pub fn arn(&self, partition: &str) -> String {
        format!("arn:{partition}:s3:::{}", self.name)
    }
}

/// Named binary packaged into an uploaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBinary {
    /// File name inside the archive.
    pub name: String,
    /// File content.
    pub content: Vec<u8>,
}

impl NamedBinary {
    /// Creates a named binary.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Custom resource uploaded alongside the environment template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomResource {
    /// Logical name the template refers to the resource by.
    pub logical_name: String,
    /// Object key the packaged resource is uploaded under.
    pub key: String,
    /// Files packaged into the resource archive.
    pub files: Vec<NamedBinary>,
}

impl CustomResource {
    /// Creates a custom resource keyed by the digest of its files.
    ///
    /// The key has the form `custom-resources/<lowercase name>/<sha256>.zip`,
    /// so unchanged sources are uploaded to the same object.
    #[must_use]
    pub fn new(logical_name: impl Into<String>, files: Vec<NamedBinary>) -> Self {
        let logical_name = logical_name.into();
        let mut hasher = Sha256::new();
        for file in &files {
            hasher.update(file.name.as_bytes());
            hasher.update(&file.content);
        }
        let key = format!(
            "{CUSTOM_RESOURCE_KEY_PREFIX}/{}/{:x}.zip",
            logical_name.to_lowercase(),
            hasher.finalize()
        );
        Self {
            logical_name,
            key,
            files,
        }
    }
}

/// Set of custom resources published for every environment upgrade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    /// Resources in publishing order.
    pub resources: Vec<CustomResource>,
}

impl ResourceSet {
    /// Creates a resource set.
    #[must_use]
    pub const fn new(resources: Vec<CustomResource>) -> Self {
        Self {
            resources,
        }
    }

    /// Returns true when the set has no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ============================================================================
// SECTION: Upgrade Input
// ============================================================================

/// Full parameter set for regenerating an environment template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeInput {
    /// Target template version.
    pub version: TemplateVersion,
    /// Application name.
    pub app: AppName,
    /// Application custom domain, if any.
    pub app_domain: Option<String>,
    /// Environment name.
    pub env: EnvName,
    /// Artifact bucket ARN.
    pub artifact_bucket_arn: String,
    /// Artifact bucket encryption key ARN.
    pub artifact_bucket_key_arn: Option<String>,
    /// Uploaded custom-resource URLs keyed by logical name.
    pub custom_resource_urls: BTreeMap<String, String>,
    /// Network override, if any.
    pub network: Option<NetworkOverride>,
    /// Imported certificate ARNs.
    pub import_cert_arns: Vec<String>,
    /// Internal load balancer subnets.
    pub internal_alb_subnets: Vec<String>,
    /// Allows VPC ingress to the internal load balancer.
    pub allow_vpc_ingress: bool,
    /// Role the stack service assumes while applying the update.
    pub execution_role_arn: String,
    /// Telemetry settings.
    pub telemetry: Option<Telemetry>,
}

impl UpgradeInput {
    /// Returns true when no customization is carried by this input.
    #[must_use]
    pub fn is_uncustomized(&self) -> bool {
        self.network.is_none()
            && self.import_cert_arns.is_empty()
            && self.internal_alb_subnets.is_empty()
            && !self.allow_vpc_ingress
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_arn_uses_partition() {
        let bucket = ArtifactBucket {
            name: "stackset-bucket".to_string(),
            kms_key_arn: None,
        };
        assert_eq!(bucket.arn(DEFAULT_PARTITION), "arn:aws:s3:::stackset-bucket");
        assert_eq!(bucket.arn("aws-cn"), "arn:aws-cn:s3:::stackset-bucket");
    }

    #[test]
    fn resource_key_tracks_content() {
        let first = CustomResource::new(
            "CustomDomainFunction",
            vec![NamedBinary::new("index.js", b"exports.handler = 1;".to_vec())],
        );
        let same = CustomResource::new(
            "CustomDomainFunction",
            vec![NamedBinary::new("index.js", b"exports.handler = 1;".to_vec())],
        );
        let changed = CustomResource::new(
            "CustomDomainFunction",
            vec![NamedBinary::new("index.js", b"exports.handler = 2;".to_vec())],
        );
        assert_eq!(first.key, same.key);
        assert_ne!(first.key, changed.key);
        assert!(first.key.starts_with("custom-resources/customdomainfunction/"));
        assert!(first.key.ends_with(".zip"));
    }
}
