// crates/envlift-core/src/core/manifest.rs
// ============================================================================
// Module: envlift Environment Manifest
// Description: Manifest subset reconstructed from stored environment records.
// Purpose: Convert stored customizations into the environment manifest shape.
// Dependencies: serde, serde_yaml
// ============================================================================

//! ## Overview
//! Environments created by older releases only persisted their customizations
//! in the configuration store. [`EnvironmentManifest::from_env_config`] turns
//! such a record back into the manifest fields the upgrade consumes. Empty
//! sections are omitted when serialized.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::records::CustomConfig;
use crate::core::records::EnvironmentRecord;
use crate::core::records::ImportedVpc;
use crate::core::records::ManagedVpc;
use crate::core::records::NetworkOverride;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Manifest type tag for environments.
pub const ENVIRONMENT_MANIFEST_TYPE: &str = "Environment";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Manifest errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Serialization or parsing failed.
    #[error("environment manifest yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Environment manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentManifest {
    /// Environment name.
    pub name: String,
    /// Manifest type.
    #[serde(rename = "type")]
    pub manifest_type: String,
    /// Network configuration.
    #[serde(default, skip_serializing_if = "NetworkConfig::is_empty")]
    pub network: NetworkConfig,
    /// Load balancer configuration.
    #[serde(default, skip_serializing_if = "HttpConfig::is_empty")]
    pub http: HttpConfig,
    /// Observability configuration.
    #[serde(default, skip_serializing_if = "ObservabilityConfig::is_empty")]
    pub observability: ObservabilityConfig,
}

/// Network section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// VPC configuration.
    #[serde(default, skip_serializing_if = "VpcConfig::is_empty")]
    pub vpc: VpcConfig,
}

/// VPC section: either an imported VPC id or a managed CIDR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VpcConfig {
    /// Imported VPC identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Managed VPC CIDR block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    /// Subnet placement.
    #[serde(default, skip_serializing_if = "SubnetsConfig::is_empty")]
    pub subnets: SubnetsConfig,
}

/// Public and private subnet lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetsConfig {
    /// Public subnets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<Vec<SubnetConfig>>,
    /// Private subnets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<Vec<SubnetConfig>>,
}

/// Single subnet: an imported id, or a managed CIDR with optional zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetConfig {
    /// Imported subnet identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Managed subnet CIDR block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    /// Availability zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az: Option<String>,
}

/// Load balancer section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Public load balancer.
    #[serde(default, skip_serializing_if = "PublicHttpConfig::is_empty")]
    pub public: PublicHttpConfig,
    /// Internal load balancer.
    #[serde(default, skip_serializing_if = "PrivateHttpConfig::is_empty")]
    pub private: PrivateHttpConfig,
}

/// Public load balancer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicHttpConfig {
    /// Imported certificate ARNs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<String>,
}

/// Internal load balancer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrivateHttpConfig {
    /// Subnets the internal load balancer is placed in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,
    /// Imported certificate ARNs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<String>,
    /// Allows ingress from the VPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_ingress: Option<bool>,
}

/// Observability section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Container insights flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_insights: Option<bool>,
}

// ============================================================================
// SECTION: Emptiness
// ============================================================================

impl NetworkConfig {
    /// Returns true when no network setting is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vpc.is_empty()
    }
}

impl VpcConfig {
    /// Returns true when no VPC setting is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.cidr.is_none() && self.subnets.is_empty()
    }

    /// Returns the imported VPC described by this section, if any.
    #[must_use]
    pub fn imported_vpc(&self) -> Option<ImportedVpc> {
        let id = self.id.clone()?;
        let ids = |subnets: Option<&Vec<SubnetConfig>>| -> Vec<String> {
            subnets.into_iter().flatten().filter_map(|subnet| subnet.id.clone()).collect()
        };
        Some(ImportedVpc {
            id,
            public_subnet_ids: ids(self.subnets.public.as_ref()),
            private_subnet_ids: ids(self.subnets.private.as_ref()),
        })
    }

    /// Returns the managed VPC described by this section, if any.
    ///
    /// Subnets are ordered by availability zone so that public and private
    /// CIDRs line up with the zone list.
    #[must_use]
    pub fn managed_vpc(&self) -> Option<ManagedVpc> {
        if self.id.is_some() {
            return None;
        }
        let cidr = self.cidr.clone()?;
        let sorted = |subnets: Option<&Vec<SubnetConfig>>| -> Vec<SubnetConfig> {
            let mut subnets: Vec<SubnetConfig> = subnets.cloned().unwrap_or_default();
            subnets.sort_by(|a, b| a.az.cmp(&b.az));
            subnets
        };
        let public = sorted(self.subnets.public.as_ref());
        let private = sorted(self.subnets.private.as_ref());
        Some(ManagedVpc {
            cidr,
            availability_zones: public.iter().filter_map(|subnet| subnet.az.clone()).collect(),
            public_subnet_cidrs: public.iter().filter_map(|subnet| subnet.cidr.clone()).collect(),
            private_subnet_cidrs: private.iter().filter_map(|subnet| subnet.cidr.clone()).collect(),
        })
    }
}

impl SubnetsConfig {
    /// Returns true when neither subnet list is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.public.is_none() && self.private.is_none()
    }
}

impl HttpConfig {
    /// Returns true when neither load balancer is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.private.is_empty()
    }
}

impl PublicHttpConfig {
    /// Returns true when no public load balancer setting is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

impl PrivateHttpConfig {
    /// Returns true when no internal load balancer setting is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subnets.is_empty() && self.certificates.is_empty() && self.vpc_ingress.is_none()
    }
}

impl ObservabilityConfig {
    /// Returns true when no observability setting is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.container_insights.is_none()
    }
}

// ============================================================================
// SECTION: Conversion
// ============================================================================

impl EnvironmentManifest {
    /// Builds the manifest subset from a stored environment record.
    #[must_use]
    pub fn from_env_config(record: &EnvironmentRecord) -> Self {
        let mut manifest = Self {
            name: record.name.to_string(),
            manifest_type: ENVIRONMENT_MANIFEST_TYPE.to_string(),
            ..Self::default()
        };
        if let Some(custom) = &record.custom_config {
            manifest.network.vpc = vpc_from_override(custom.network.as_ref());
            manifest.http = http_from_custom_config(custom);
        }
        if let Some(telemetry) = record.telemetry {
            manifest.observability.container_insights = Some(telemetry.container_insights);
        }
        manifest
    }

    /// Serializes the manifest as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Yaml`] when serialization fails.
    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parses a manifest from YAML, rejecting unknown fields.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Yaml`] when the document is malformed.
    pub fn from_yaml(body: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(body)?)
    }
}

/// Converts a network override into the manifest VPC section.
fn vpc_from_override(network: Option<&NetworkOverride>) -> VpcConfig {
    match network {
        None => VpcConfig::default(),
        Some(NetworkOverride::Imported(imported)) => {
            let subnets = |ids: &[String]| -> Vec<SubnetConfig> {
                ids.iter()
                    .map(|id| SubnetConfig {
                        id: Some(id.clone()),
                        ..SubnetConfig::default()
                    })
                    .collect()
            };
            VpcConfig {
                id: Some(imported.id.clone()).filter(|id| !id.is_empty()),
                cidr: None,
                subnets: SubnetsConfig {
                    public: Some(subnets(&imported.public_subnet_ids)),
                    private: Some(subnets(&imported.private_subnet_ids)),
                },
            }
        }
        Some(NetworkOverride::Managed(managed)) => {
            let subnets = |cidrs: &[String]| -> Option<Vec<SubnetConfig>> {
                if cidrs.is_empty() {
                    return None;
                }
                Some(
                    cidrs
                        .iter()
                        .enumerate()
                        .map(|(index, cidr)| SubnetConfig {
                            id: None,
                            cidr: Some(cidr.clone()),
                            az: managed.availability_zones.get(index).cloned(),
                        })
                        .collect(),
                )
            };
            VpcConfig {
                id: None,
                cidr: Some(managed.cidr.clone()).filter(|cidr| !cidr.is_empty()),
                subnets: SubnetsConfig {
                    public: subnets(&managed.public_subnet_cidrs),
                    private: subnets(&managed.private_subnet_cidrs),
                },
            }
        }
    }
}

/// Places imported certificates on the public or internal load balancer.
fn http_from_custom_config(custom: &CustomConfig) -> HttpConfig {
    let mut http = HttpConfig::default();
    if custom.import_cert_arns.is_empty() {
        return http;
    }
    let private_only = matches!(
        &custom.network,
        Some(NetworkOverride::Imported(imported)) if imported.public_subnet_ids.is_empty()
    );
    if private_only {
        http.private.subnets.clone_from(&custom.internal_alb_subnets);
        http.private.certificates.clone_from(&custom.import_cert_arns);
        http.private.vpc_ingress = custom.allow_vpc_ingress.then_some(true);
    } else {
        http.public.certificates.clone_from(&custom.import_cert_arns);
    }
    http
}

// ============================================================================
// SECTION: Tests
// ============================================================================
