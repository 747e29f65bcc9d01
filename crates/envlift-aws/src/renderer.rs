// crates/envlift-aws/src/renderer.rs
// ============================================================================
// Module: envlift Template Renderer
// Description: Environment templates read from a directory and filled from upgrade input.
// Purpose: Produce the template body and parameters submitted for an upgrade.
// Dependencies: envlift-core
// ============================================================================

//! ## Overview
//! Templates live under `<dir>/environment/`: one `<version>.yml` per release
//! and `legacy.yml`, the canonical body of pre-versioning environments.
//!
//! Rendering substitutes `{{ name }}` placeholders in the body and derives
//! stack parameters from the upgrade input. Only parameters the template
//! declares are returned. Unknown or unterminated placeholders fail the
//! render; `{{resolve:...}}` dynamic references are left untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use envlift_core::AppName;
use envlift_core::LegacyTemplater;
use envlift_core::NetworkOverride;
use envlift_core::StackError;
use envlift_core::TemplateDocument;
use envlift_core::TemplateVersion;
use envlift_core::TemplaterError;
use envlift_core::UpgradeInput;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Subdirectory holding environment templates.
const ENVIRONMENT_DIR: &str = "environment";
/// Canonical legacy template file name.
const LEGACY_TEMPLATE_NAME: &str = "legacy.yml";
/// Maximum template size in bytes.
const MAX_TEMPLATE_BYTES: u64 = 1024 * 1024;
/// Prefix of dynamic references resolved by the stack service.
const DYNAMIC_REFERENCE_PREFIX: &str = "resolve:";
/// Prefix of custom resource URL placeholders.
const CUSTOM_RESOURCE_PLACEHOLDER: &str = "custom_resource_url.";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Template body and parameter values for one stack update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    /// Rendered body.
    pub body: String,
    /// Parameter values keyed by declared parameter name.
    pub parameters: BTreeMap<String, String>,
}

/// Renders environment templates stored in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryRenderer {
    /// Template root.
    dir: PathBuf,
}

impl DirectoryRenderer {
    /// Creates a renderer over `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Returns the path of the template for `version`.
    #[must_use]
    pub fn template_path(&self, version: &TemplateVersion) -> PathBuf {
        self.dir.join(ENVIRONMENT_DIR).join(format!("{version}.yml"))
    }

    /// Returns the path of the canonical legacy template.
    #[must_use]
    pub fn legacy_path(&self) -> PathBuf {
        self.dir.join(ENVIRONMENT_DIR).join(LEGACY_TEMPLATE_NAME)
    }

    /// Renders the template for `input.version`.
    ///
    /// `lb_workloads` is set for legacy upgrades and becomes the
    /// `ALBWorkloads` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Render`] when the template is missing, malformed,
    /// or references an unknown placeholder.
    pub fn render(
        &self,
        input: &UpgradeInput,
        lb_workloads: Option<&[String]>,
    ) -> Result<RenderedTemplate, StackError> {
        let raw = read_template(&self.template_path(&input.version)).map_err(StackError::Render)?;
        let body = substitute_placeholders(&raw, input).map_err(StackError::Render)?;
        let declared = TemplateDocument::parse(&body)
            .map_err(|err| StackError::Render(err.to_string()))?
            .declared_parameters();
        let parameters = environment_parameters(input, lb_workloads)
            .into_iter()
            .filter(|(name, _)| declared.iter().any(|declared| declared == name))
            .collect();
        Ok(RenderedTemplate {
            body,
            parameters,
        })
    }
}

impl LegacyTemplater for DirectoryRenderer {
    fn default_template(&self, _app: &AppName) -> Result<String, TemplaterError> {
        read_template(&self.legacy_path()).map_err(TemplaterError)
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Reads a bounded UTF-8 template file.
fn read_template(path: &Path) -> Result<String, String> {
    let describe = |err: std::io::Error| format!("read template {}: {err}", path.display());
    let size = fs::metadata(path).map_err(describe)?.len();
    if size > MAX_TEMPLATE_BYTES {
        return Err(format!("template {} exceeds size limit", path.display()));
    }
    fs::read_to_string(path).map_err(describe)
}

/// Replaces every `{{ name }}` placeholder with its value from `input`.
///
/// # Errors
///
/// Returns a message naming the unknown or unterminated placeholder.
pub fn substitute_placeholders(body: &str, input: &UpgradeInput) -> Result<String, String> {
    let mut rendered = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[.. start]);
        let after = &rest[start + 2 ..];
        let end = after
            .find("}}")
            .ok_or_else(|| "unterminated template placeholder".to_string())?;
        let name = after[.. end].trim();
        if name.starts_with(DYNAMIC_REFERENCE_PREFIX) {
            rendered.push_str(&rest[start .. start + 2 + end + 2]);
        } else {
            rendered.push_str(&placeholder_value(name, input)?);
        }
        rest = &after[end + 2 ..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}

/// Resolves one placeholder.
fn placeholder_value(name: &str, input: &UpgradeInput) -> Result<String, String> {
    match name {
        "version" => Ok(input.version.to_string()),
        "artifact_bucket_arn" => Ok(input.artifact_bucket_arn.clone()),
        "artifact_kms_key_arn" => Ok(input.artifact_bucket_key_arn.clone().unwrap_or_default()),
        _ => name
            .strip_prefix(CUSTOM_RESOURCE_PLACEHOLDER)
            .and_then(|logical| input.custom_resource_urls.get(logical).cloned())
            .ok_or_else(|| format!("unknown template placeholder '{name}'")),
    }
}

/// Derives every parameter value the upgrade input can supply.
#[must_use]
pub fn environment_parameters(
    input: &UpgradeInput,
    lb_workloads: Option<&[String]>,
) -> BTreeMap<String, String> {
    let mut parameters = BTreeMap::new();
    let mut set = |name: &str, value: String| {
        parameters.insert(name.to_string(), value);
    };
    set("AppName", input.app.to_string());
    set("EnvironmentName", input.env.to_string());
    set("AppDNSName", input.app_domain.clone().unwrap_or_default());
    if let Some(workloads) = lb_workloads {
        set("ALBWorkloads", workloads.join(","));
    }
    match &input.network {
        Some(NetworkOverride::Imported(vpc)) => {
            set("ImportedVPCID", vpc.id.clone());
            set("ImportedPublicSubnetIDs", vpc.public_subnet_ids.join(","));
            set("ImportedPrivateSubnetIDs", vpc.private_subnet_ids.join(","));
        }
        Some(NetworkOverride::Managed(vpc)) => {
            set("VPCCIDR", vpc.cidr.clone());
            set("AvailabilityZones", vpc.availability_zones.join(","));
            set("PublicSubnetCIDRs", vpc.public_subnet_cidrs.join(","));
            set("PrivateSubnetCIDRs", vpc.private_subnet_cidrs.join(","));
        }
        None => {}
    }
    set("ImportedCertARNs", input.import_cert_arns.join(","));
    set("InternalALBSubnets", input.internal_alb_subnets.join(","));
    set("AllowVPCIngress", input.allow_vpc_ingress.to_string());
    if let Some(telemetry) = input.telemetry {
        let value = if telemetry.container_insights { "enabled" } else { "disabled" };
        set("ContainerInsights", value.to_string());
    }
    parameters
}
