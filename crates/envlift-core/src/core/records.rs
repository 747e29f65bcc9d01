// crates/envlift-core/src/core/records.rs
// ============================================================================
// Module: envlift Configuration Records
// Description: Application, environment, and workload records read from the store.
// Purpose: Model stored configuration with explicit alternatives for VPC overrides.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Records are read-only inputs owned by the configuration store. The store's
//! serialized form keeps the imported VPC and the adjusted VPC as two optional
//! fields; here they collapse into a single [`NetworkOverride`] sum type. The
//! translation happens once, at the store boundary, through the `Stored*` wire
//! types and [`TryFrom`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::AppName;
use crate::core::identifiers::EnvName;

// ============================================================================
// SECTION: Domain Records
// ============================================================================

/// Application record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    /// Application name.
    pub name: AppName,
    /// Optional custom domain registered for the application.
    pub domain: Option<String>,
}

/// Environment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRecord {
    /// Parent application name.
    pub app: AppName,
    /// Environment name.
    pub name: EnvName,
    /// Region the environment is deployed to.
    pub region: String,
    /// Role assumed to manage the environment's resources.
    pub manager_role_arn: String,
    /// Role the stack service assumes while applying template updates.
    pub execution_role_arn: String,
    /// Customizations captured when the environment was created.
    pub custom_config: Option<CustomConfig>,
    /// Telemetry settings.
    pub telemetry: Option<Telemetry>,
}

/// Stored environment customizations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomConfig {
    /// Network override, if any.
    pub network: Option<NetworkOverride>,
    /// Imported certificate ARNs for the load balancers.
    pub import_cert_arns: Vec<String>,
    /// Subnets the internal load balancer is placed in.
    pub internal_alb_subnets: Vec<String>,
    /// Allows ingress from the VPC to the internal load balancer.
    pub allow_vpc_ingress: bool,
}

/// Network override: at most one of the two alternatives is ever active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkOverride {
    /// An existing VPC imported into the environment.
    Imported(ImportedVpc),
    /// A managed VPC with adjusted CIDR ranges.
    Managed(ManagedVpc),
}

/// Imported VPC descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedVpc {
    /// VPC identifier.
    pub id: String,
    /// Public subnet identifiers.
    pub public_subnet_ids: Vec<String>,
    /// Private subnet identifiers.
    pub private_subnet_ids: Vec<String>,
}

/// Managed (adjusted) VPC descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedVpc {
    /// VPC CIDR block.
    pub cidr: String,
    /// Availability zone names, positionally matched to subnet CIDRs.
    pub availability_zones: Vec<String>,
    /// Public subnet CIDR blocks.
    pub public_subnet_cidrs: Vec<String>,
    /// Private subnet CIDR blocks.
    pub private_subnet_cidrs: Vec<String>,
}

/// Telemetry settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Enables container insights on the environment cluster.
    pub container_insights: bool,
}

/// Workload record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRecord {
    /// Parent application name.
    pub app: AppName,
    /// Workload name.
    pub name: String,
    /// Workload type.
    pub workload_type: WorkloadType,
}

/// Workload type as stored by the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadType {
    /// Service fronted by the environment's public load balancer.
    LoadBalancedWebService,
    /// Service reachable only inside the environment.
    BackendService,
    /// Queue-consuming service.
    WorkerService,
    /// Service hosted on a request-driven platform.
    RequestDrivenWebService,
    /// Scheduled job.
    ScheduledJob,
    /// Any type this tool does not know about.
    Other(String),
}

impl WorkloadType {
    /// Parses a stored workload type name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "Load Balanced Web Service" => Self::LoadBalancedWebService,
            "Backend Service" => Self::BackendService,
            "Worker Service" => Self::WorkerService,
            "Request-Driven Web Service" => Self::RequestDrivenWebService,
            "Scheduled Job" => Self::ScheduledJob,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the stored type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::LoadBalancedWebService => "Load Balanced Web Service",
            Self::BackendService => "Backend Service",
            Self::WorkerService => "Worker Service",
            Self::RequestDrivenWebService => "Request-Driven Web Service",
            Self::ScheduledJob => "Scheduled Job",
            Self::Other(name) => name,
        }
    }
}

// ============================================================================
// SECTION: Stored Wire Forms
// ============================================================================

/// Stored application document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoredApplication {
    /// Application name.
    pub name: String,
    /// Custom domain; empty when unset.
    #[serde(default)]
    pub domain: String,
}

/// Stored environment document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoredEnvironment {
    /// Parent application name.
    pub app: String,
    /// Environment name.
    pub name: String,
    /// Deployment region.
    #[serde(default)]
    pub region: String,
    /// Execution role ARN.
    #[serde(rename = "executionRoleARN", default)]
    pub execution_role_arn: String,
    /// Manager role ARN.
    #[serde(rename = "managerRoleARN", default)]
    pub manager_role_arn: String,
    /// Stored customizations.
    #[serde(rename = "customConfig", default, skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<StoredCustomConfig>,
    /// Stored telemetry settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<StoredTelemetry>,
}

/// Stored customization document with twin optional VPC fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoredCustomConfig {
    /// Imported VPC, if any.
    #[serde(rename = "importVPC", default, skip_serializing_if = "Option::is_none")]
    pub import_vpc: Option<StoredImportVpc>,
    /// Adjusted VPC, if any.
    #[serde(rename = "vpcConfig", default, skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<StoredAdjustVpc>,
    /// Imported certificate ARNs.
    #[serde(rename = "importCertARNs", default)]
    pub import_cert_arns: Vec<String>,
    /// Internal load balancer subnets.
    #[serde(rename = "internalALBSubnets", default)]
    pub internal_alb_subnets: Vec<String>,
    /// VPC ingress flag for the internal load balancer.
    #[serde(rename = "enableInternalALBVPCIngress", default)]
    pub enable_internal_alb_vpc_ingress: bool,
}

/// Stored imported VPC.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoredImportVpc {
    /// VPC identifier.
    #[serde(default)]
    pub id: String,
    /// Public subnet identifiers.
    #[serde(rename = "publicSubnetIDs", default)]
    pub public_subnet_ids: Vec<String>,
    /// Private subnet identifiers.
    #[serde(rename = "privateSubnetIDs", default)]
    pub private_subnet_ids: Vec<String>,
}

/// Stored adjusted VPC.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoredAdjustVpc {
    /// VPC CIDR block.
    #[serde(rename = "cidr", default)]
    pub cidr: String,
    /// Availability zone names.
    #[serde(rename = "availabilityZoneNames", default)]
    pub availability_zones: Vec<String>,
    /// Public subnet CIDR blocks.
    #[serde(rename = "publicSubnetCIDRs", default)]
    pub public_subnet_cidrs: Vec<String>,
    /// Private subnet CIDR blocks.
    #[serde(rename = "privateSubnetCIDRs", default)]
    pub private_subnet_cidrs: Vec<String>,
}

/// Stored telemetry settings.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct StoredTelemetry {
    /// Container insights flag.
    #[serde(rename = "containerInsights", default)]
    pub container_insights: bool,
}

/// Stored workload document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoredWorkload {
    /// Parent application name.
    pub app: String,
    /// Workload name.
    pub name: String,
    /// Workload type name.
    #[serde(rename = "type")]
    pub workload_type: String,
}

/// Errors translating stored documents into records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Both VPC alternatives were populated.
    #[error("environment {env} in application {app} stores both an imported and an adjusted vpc")]
    ConflictingNetworkOverride {
        /// Application name.
        app: String,
        /// Environment name.
        env: String,
    },
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<StoredApplication> for ApplicationRecord {
    fn from(value: StoredApplication) -> Self {
        let domain = Some(value.domain).filter(|domain| !domain.is_empty());
        Self {
            name: AppName::new(value.name),
            domain,
        }
    }
}

impl TryFrom<StoredEnvironment> for EnvironmentRecord {
    type Error = RecordError;

    fn try_from(value: StoredEnvironment) -> Result<Self, Self::Error> {
        let custom_config = match value.custom_config {
            Some(stored) => Some(stored.into_custom_config(&value.app, &value.name)?),
            None => None,
        };
        Ok(Self {
            app: AppName::new(value.app),
            name: EnvName::new(value.name),
            region: value.region,
            manager_role_arn: value.manager_role_arn,
            execution_role_arn: value.execution_role_arn,
            custom_config,
            telemetry: value.telemetry.map(|telemetry| Telemetry {
                container_insights: telemetry.container_insights,
            }),
        })
    }
}

impl StoredCustomConfig {
    /// Collapses the twin optional VPC fields into a [`NetworkOverride`].
    fn into_custom_config(self, app: &str, env: &str) -> Result<CustomConfig, RecordError> {
        let network = match (self.import_vpc, self.vpc_config) {
            (Some(_), Some(_)) => {
                return Err(RecordError::ConflictingNetworkOverride {
                    app: app.to_string(),
                    env: env.to_string(),
                });
            }
            (Some(imported), None) => Some(NetworkOverride::Imported(ImportedVpc {
                id: imported.id,
                public_subnet_ids: imported.public_subnet_ids,
                private_subnet_ids: imported.private_subnet_ids,
            })),
            (None, Some(managed)) => Some(NetworkOverride::Managed(ManagedVpc {
                cidr: managed.cidr,
                availability_zones: managed.availability_zones,
                public_subnet_cidrs: managed.public_subnet_cidrs,
                private_subnet_cidrs: managed.private_subnet_cidrs,
            })),
            (None, None) => None,
        };
        Ok(CustomConfig {
            network,
            import_cert_arns: self.import_cert_arns,
            internal_alb_subnets: self.internal_alb_subnets,
            allow_vpc_ingress: self.enable_internal_alb_vpc_ingress,
        })
    }
}

impl From<StoredWorkload> for WorkloadRecord {
    fn from(value: StoredWorkload) -> Self {
        Self {
            app: AppName::new(value.app),
            name: value.name,
            workload_type: WorkloadType::from_type_name(&value.workload_type),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::*;

    #[test]
    fn stored_environment_with_imported_vpc_becomes_imported_override() {
        let stored: StoredEnvironment = serde_json::from_str(
            r#"{"app":"phonetool","name":"test","region":"us-west-2",
                "executionRoleARN":"arn:exec","managerRoleARN":"arn:manager",
                "customConfig":{"importVPC":{"id":"vpc-1","publicSubnetIDs":["pub1"],
                "privateSubnetIDs":["priv1"]},"importCertARNs":["arn:cert"]}}"#,
        )
        .expect("decode");
        let record = EnvironmentRecord::try_from(stored).expect("convert");
        let custom = record.custom_config.expect("custom config");
        assert_eq!(
            custom.network,
            Some(NetworkOverride::Imported(ImportedVpc {
                id: "vpc-1".to_string(),
                public_subnet_ids: vec!["pub1".to_string()],
                private_subnet_ids: vec!["priv1".to_string()],
            }))
        );
        assert_eq!(custom.import_cert_arns, vec!["arn:cert".to_string()]);
    }

    #[test]
    fn stored_environment_with_both_vpcs_is_rejected() {
        let stored = StoredEnvironment {
            app: "phonetool".to_string(),
            name: "test".to_string(),
            custom_config: Some(StoredCustomConfig {
                import_vpc: Some(StoredImportVpc::default()),
                vpc_config: Some(StoredAdjustVpc::default()),
                ..StoredCustomConfig::default()
            }),
            ..StoredEnvironment::default()
        };
        let err = EnvironmentRecord::try_from(stored).expect_err("conflict");
        assert!(matches!(err, RecordError::ConflictingNetworkOverride { .. }));
    }

    #[test]
    fn empty_domain_is_absent() {
        let record = ApplicationRecord::from(StoredApplication {
            name: "phonetool".to_string(),
            domain: String::new(),
        });
        assert_eq!(record.domain, None);
    }

    #[test]
    fn workload_type_round_trips_unknown_names() {
        let kind = WorkloadType::from_type_name("Static Site");
        assert_eq!(kind, WorkloadType::Other("Static Site".to_string()));
        assert_eq!(kind.as_str(), "Static Site");
    }
}
