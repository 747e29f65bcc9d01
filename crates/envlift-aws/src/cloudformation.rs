// crates/envlift-aws/src/cloudformation.rs
// ============================================================================
// Module: envlift CloudFormation Collaborators
// Description: Environment stack client, version describer, and resource discovery.
// Purpose: Read, patch, and upgrade environment stacks through CloudFormation.
// Dependencies: aws-sdk-cloudformation, envlift-core, tokio, tracing
// ============================================================================

//! ## Overview
//! An environment's stack is named `<app>-<env>`. Updates submit a full
//! template body with the execution role and IAM capabilities, then poll the
//! stack until it leaves its in-progress states. The service's "No updates
//! are to be performed" validation error surfaces as
//! [`StackError::EmptyChangeSet`]; callers decide whether that is a failure.
//!
//! Regional resources come from the application's stack-set instance in each
//! region, whose outputs name the artifact bucket and its KMS key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::Capability;
use aws_sdk_cloudformation::types::Parameter;
use aws_sdk_cloudformation::types::TemplateStage;
use envlift_core::AppName;
use envlift_core::ApplicationRecord;
use envlift_core::ArtifactBucket;
use envlift_core::DiscoveryError;
use envlift_core::EnvName;
use envlift_core::ResourceDiscovery;
use envlift_core::StackClient;
use envlift_core::StackError;
use envlift_core::TemplateDocument;
use envlift_core::TemplateVersion;
use envlift_core::UpgradeInput;
use envlift_core::VersionDescriber;
use envlift_core::extract_version;
use tracing::debug;
use tracing::info;

use crate::renderer::DirectoryRenderer;
use crate::renderer::RenderedTemplate;
use crate::runtime::AwsRuntime;
use crate::session::AwsSession;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Validation message returned when an update changes nothing.
const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";
/// Validation message suffix returned for missing stacks.
const DOES_NOT_EXIST_MESSAGE: &str = "does not exist";
/// Stack output naming the artifact bucket.
const BUCKET_OUTPUT: &str = "PipelineBucket";
/// Stack output naming the artifact bucket's KMS key.
const KMS_KEY_OUTPUT: &str = "KMSKeyARN";

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the stack name of an environment.
#[must_use]
pub fn stack_name(app: &AppName, env: &EnvName) -> String {
    format!("{app}-{env}")
}

/// Maps a service error message to a stack error.
#[must_use]
pub fn classify_service_error(stack: &str, message: &str) -> StackError {
    if message.contains(NO_UPDATES_MESSAGE) {
        StackError::EmptyChangeSet {
            stack: stack.to_string(),
        }
    } else if message.contains(DOES_NOT_EXIST_MESSAGE) {
        StackError::StackNotFound {
            stack: stack.to_string(),
        }
    } else {
        StackError::Backend(format!("stack {stack}: {message}"))
    }
}

/// Returns the service message of an SDK error, or its display form.
fn error_message<E: ProvideErrorMetadata + std::fmt::Display>(err: &E) -> String {
    err.message().map_or_else(|| err.to_string(), str::to_string)
}

/// Progress class of a stack status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The stack is still changing.
    InProgress,
    /// The update finished successfully.
    Succeeded,
    /// The update failed or rolled back.
    Failed,
}

/// Classifies a stack status string.
#[must_use]
pub fn classify_status(status: &str) -> StatusClass {
    if status.ends_with("_IN_PROGRESS") {
        StatusClass::InProgress
    } else if status == "UPDATE_COMPLETE" || status == "CREATE_COMPLETE" {
        StatusClass::Succeeded
    } else {
        StatusClass::Failed
    }
}

/// Returns true for the application's stack-set instance stacks.
#[must_use]
pub fn is_infrastructure_stack(app: &AppName, name: &str) -> bool {
    let stack_set = format!("{app}-infrastructure");
    name == stack_set || name.starts_with(&format!("StackSet-{stack_set}-"))
}

/// Reads the artifact bucket from stack outputs.
#[must_use]
pub fn bucket_from_outputs(outputs: &BTreeMap<String, String>) -> Option<ArtifactBucket> {
    let name = outputs.get(BUCKET_OUTPUT).filter(|name| !name.is_empty())?;
    Some(ArtifactBucket {
        name: name.clone(),
        kms_key_arn: outputs.get(KMS_KEY_OUTPUT).filter(|arn| !arn.is_empty()).cloned(),
    })
}

/// Builds the parameter list of an update.
///
/// Rendered values are passed explicitly. A parameter the stack already has
/// keeps its previous value only while the new template still declares it.
#[must_use]
pub fn update_parameters(
    existing: &[String],
    declared: &[String],
    rendered: &BTreeMap<String, String>,
) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = rendered
        .iter()
        .map(|(key, value)| Parameter::builder().parameter_key(key).parameter_value(value).build())
        .collect();
    parameters.extend(
        existing
            .iter()
            .filter(|key| !rendered.contains_key(*key) && declared.contains(*key))
            .map(|key| Parameter::builder().parameter_key(key).use_previous_value(true).build()),
    );
    parameters
}

// ============================================================================
// SECTION: Stack Operations
// ============================================================================

/// Polling bounds for stack updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    /// Interval between status reads.
    pub poll_interval: Duration,
    /// Maximum wait for a terminal status.
    pub timeout: Duration,
}

/// Async stack operations shared by the stack client and describer.
#[derive(Debug, Clone)]
struct StackOps {
    /// CloudFormation client.
    client: Client,
    /// Polling bounds.
    wait: WaitSettings,
}

impl StackOps {
    /// Fetches the original template body of a stack.
    async fn template(&self, stack: String) -> Result<String, StackError> {
        let output = self
            .client
            .get_template()
            .stack_name(&stack)
            .template_stage(TemplateStage::Original)
            .send()
            .await
            .map_err(|err| classify_service_error(&stack, &error_message(&err)))?;
        output
            .template_body()
            .map(str::to_string)
            .ok_or_else(|| StackError::Backend(format!("stack {stack} returned no template body")))
    }

    /// Returns the names of the stack's current parameters.
    async fn parameter_keys(&self, stack: &str) -> Result<Vec<String>, StackError> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack)
            .send()
            .await
            .map_err(|err| classify_service_error(stack, &error_message(&err)))?;
        let described = output.stacks().first().ok_or_else(|| StackError::StackNotFound {
            stack: stack.to_string(),
        })?;
        Ok(described
            .parameters()
            .iter()
            .filter_map(|parameter| parameter.parameter_key().map(str::to_string))
            .collect())
    }

    /// Submits an update and waits for it to finish.
    async fn update(
        &self,
        stack: String,
        body: String,
        parameters: BTreeMap<String, String>,
        role_arn: String,
    ) -> Result<(), StackError> {
        let existing = self.parameter_keys(&stack).await?;
        let declared = TemplateDocument::parse(&body)
            .map_err(|err| StackError::Render(err.to_string()))?
            .declared_parameters();
        self.client
            .update_stack()
            .stack_name(&stack)
            .template_body(body)
            .set_parameters(Some(update_parameters(&existing, &declared, &parameters)))
            .capabilities(Capability::CapabilityIam)
            .capabilities(Capability::CapabilityNamedIam)
            .capabilities(Capability::CapabilityAutoExpand)
            .role_arn(role_arn)
            .send()
            .await
            .map_err(|err| classify_service_error(&stack, &error_message(&err)))?;
        debug!(stack = %stack, "submitted stack update");
        self.wait_for_update(&stack).await
    }

    /// Polls the stack until its status is terminal.
    async fn wait_for_update(&self, stack: &str) -> Result<(), StackError> {
        let deadline = Instant::now() + self.wait.timeout;
        loop {
            let output = self
                .client
                .describe_stacks()
                .stack_name(stack)
                .send()
                .await
                .map_err(|err| classify_service_error(stack, &error_message(&err)))?;
            let status = output
                .stacks()
                .first()
                .and_then(|described| described.stack_status())
                .map(|status| status.as_str().to_string())
                .ok_or_else(|| StackError::StackNotFound {
                    stack: stack.to_string(),
                })?;
            match classify_status(&status) {
                StatusClass::Succeeded => return Ok(()),
                StatusClass::Failed => {
                    return Err(StackError::UpdateFailed {
                        stack: stack.to_string(),
                        status,
                    });
                }
                StatusClass::InProgress => {}
            }
            if Instant::now() >= deadline {
                return Err(StackError::Timeout {
                    stack: stack.to_string(),
                });
            }
            tokio::time::sleep(self.wait.poll_interval).await;
        }
    }
}

// ============================================================================
// SECTION: Stack Client
// ============================================================================

/// CloudFormation-backed environment stack client.
#[derive(Debug, Clone)]
pub struct CfnStackClient {
    /// Stack operations.
    ops: StackOps,
    /// Shared runtime.
    runtime: AwsRuntime,
    /// Template renderer.
    renderer: Arc<DirectoryRenderer>,
}

impl CfnStackClient {
    /// Creates a stack client.
    #[must_use]
    pub const fn new(
        client: Client,
        runtime: AwsRuntime,
        renderer: Arc<DirectoryRenderer>,
        wait: WaitSettings,
    ) -> Self {
        Self {
            ops: StackOps {
                client,
                wait,
            },
            runtime,
            renderer,
        }
    }

    /// Submits a rendered template for the input's environment.
    fn submit(&self, input: &UpgradeInput, rendered: RenderedTemplate) -> Result<(), StackError> {
        let ops = self.ops.clone();
        let stack = stack_name(&input.app, &input.env);
        let role = input.execution_role_arn.clone();
        info!(stack = %stack, version = %input.version, "updating environment stack");
        self.runtime.block_on(async move {
            ops.update(stack, rendered.body, rendered.parameters, role).await
        })
    }
}

impl StackClient for CfnStackClient {
    fn environment_template(&self, app: &AppName, env: &EnvName) -> Result<String, StackError> {
        let ops = self.ops.clone();
        let stack = stack_name(app, env);
        self.runtime.block_on(async move { ops.template(stack).await })
    }

    fn update_environment_template(
        &self,
        app: &AppName,
        env: &EnvName,
        body: &str,
        execution_role_arn: &str,
    ) -> Result<(), StackError> {
        let ops = self.ops.clone();
        let stack = stack_name(app, env);
        let body = body.to_string();
        let role = execution_role_arn.to_string();
        self.runtime
            .block_on(async move { ops.update(stack, body, BTreeMap::new(), role).await })
    }

    fn upgrade_environment(&self, input: &UpgradeInput) -> Result<(), StackError> {
        let rendered = self.renderer.render(input, None)?;
        self.submit(input, rendered)
    }

    fn upgrade_legacy_environment(
        &self,
        input: &UpgradeInput,
        lb_workloads: &[String],
    ) -> Result<(), StackError> {
        let rendered = self.renderer.render(input, Some(lb_workloads))?;
        self.submit(input, rendered)
    }
}

// ============================================================================
// SECTION: Version Describer
// ============================================================================

/// Reads an environment's template version from its deployed stack.
#[derive(Debug, Clone)]
pub struct CfnVersionDescriber {
    /// Stack operations.
    ops: StackOps,
    /// Shared runtime.
    runtime: AwsRuntime,
    /// Stack name.
    stack: String,
}

impl CfnVersionDescriber {
    /// Creates a describer for one environment.
    #[must_use]
    pub fn new(
        client: Client,
        runtime: AwsRuntime,
        app: &AppName,
        env: &EnvName,
        wait: WaitSettings,
    ) -> Self {
        Self {
            ops: StackOps {
                client,
                wait,
            },
            runtime,
            stack: stack_name(app, env),
        }
    }
}

impl VersionDescriber for CfnVersionDescriber {
    fn current_version(&self) -> Result<String, StackError> {
        let ops = self.ops.clone();
        let stack = self.stack.clone();
        let body = self.runtime.block_on(async move { ops.template(stack).await })?;
        let version = extract_version(&body).map_err(|err| {
            StackError::Backend(format!("parse template of {}: {err}", self.stack))
        })?;
        Ok(version.unwrap_or_else(TemplateVersion::legacy).to_string())
    }
}

// ============================================================================
// SECTION: Resource Discovery
// ============================================================================

/// Finds the application's regional artifact bucket.
#[derive(Debug, Clone)]
pub struct CfnResourceDiscovery {
    /// Default session.
    session: AwsSession,
}

impl CfnResourceDiscovery {
    /// Creates a discovery over the default session.
    #[must_use]
    pub const fn new(session: AwsSession) -> Self {
        Self {
            session,
        }
    }
}

impl ResourceDiscovery for CfnResourceDiscovery {
    fn resources_for_region(
        &self,
        app: &ApplicationRecord,
        region: &str,
    ) -> Result<ArtifactBucket, DiscoveryError> {
        let client = Client::new(&self.session.regional(region));
        let app_name = app.name.clone();
        let region_name = region.to_string();
        self.session.runtime().block_on(async move {
            let mut next_token: Option<String> = None;
            loop {
                let output = client
                    .describe_stacks()
                    .set_next_token(next_token.take())
                    .send()
                    .await
                    .map_err(|err| {
                        DiscoveryError::Backend(format!(
                            "describe stacks in {region_name}: {}",
                            error_message(&err)
                        ))
                    })?;
                for stack in output.stacks() {
                    let Some(name) = stack.stack_name() else {
                        continue;
                    };
                    if !is_infrastructure_stack(&app_name, name) {
                        continue;
                    }
                    let outputs: BTreeMap<String, String> = stack
                        .outputs()
                        .iter()
                        .filter_map(|output| {
                            let key = output.output_key()?.to_string();
                            Some((key, output.output_value()?.to_string()))
                        })
                        .collect();
                    if let Some(bucket) = bucket_from_outputs(&outputs) {
                        return Ok(bucket);
                    }
                }
                match output.next_token() {
                    Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                    _ => break,
                }
            }
            Err(DiscoveryError::NotFound {
                app: app_name,
                region: region_name,
            })
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::*;

    #[test]
    fn no_updates_is_an_empty_change_set() {
        let err = classify_service_error("phonetool-test", "No updates are to be performed.");
        assert!(matches!(
            err,
            StackError::EmptyChangeSet { ref stack } if stack == "phonetool-test"
        ));
        let message = "Stack with id phonetool-test does not exist";
        let err = classify_service_error("phonetool-test", message);
        assert!(matches!(err, StackError::StackNotFound { .. }));
        let err = classify_service_error("phonetool-test", "Rate exceeded");
        assert!(matches!(err, StackError::Backend(_)));
    }

    #[test]
    fn statuses_classify() {
        assert_eq!(classify_status("UPDATE_IN_PROGRESS"), StatusClass::InProgress);
        assert_eq!(
            classify_status("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            StatusClass::InProgress
        );
        assert_eq!(classify_status("UPDATE_COMPLETE"), StatusClass::Succeeded);
        assert_eq!(classify_status("UPDATE_ROLLBACK_COMPLETE"), StatusClass::Failed);
    }

    #[test]
    fn infrastructure_stacks_match_by_name() {
        let app = AppName::new("phonetool");
        assert!(is_infrastructure_stack(&app, "StackSet-phonetool-infrastructure-1a2b"));
        assert!(is_infrastructure_stack(&app, "phonetool-infrastructure"));
        assert!(!is_infrastructure_stack(&app, "StackSet-phonetool-infrastructure2-1a2b"));
        assert!(!is_infrastructure_stack(&app, "phonetool-test"));
    }

    #[test]
    fn outputs_yield_bucket() {
        let mut outputs = BTreeMap::new();
        assert_eq!(bucket_from_outputs(&outputs), None);
        outputs.insert("PipelineBucket".to_string(), "bucket-1".to_string());
        assert_eq!(
            bucket_from_outputs(&outputs),
            Some(ArtifactBucket {
                name: "bucket-1".to_string(),
                kms_key_arn: None,
            })
        );
        outputs.insert("KMSKeyARN".to_string(), "arn:kms".to_string());
        let bucket = bucket_from_outputs(&outputs).expect("bucket");
        assert_eq!(bucket.kms_key_arn.as_deref(), Some("arn:kms"));
    }

    #[test]
    fn unrendered_parameters_keep_previous_values() {
        let existing = vec!["AppName".to_string(), "ToolsAccountPrincipalARN".to_string()];
        let declared = existing.clone();
        let rendered = BTreeMap::from([("AppName".to_string(), "phonetool".to_string())]);
        let parameters = update_parameters(&existing, &declared, &rendered);
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0].parameter_value(), Some("phonetool"));
        assert_eq!(parameters[1].parameter_key(), Some("ToolsAccountPrincipalARN"));
        assert_eq!(parameters[1].use_previous_value(), Some(true));
    }

    #[test]
    fn parameters_dropped_by_new_template_are_not_sent() {
        let existing = vec!["AppName".to_string(), "RemovedInNewTemplate".to_string()];
        let declared = vec!["AppName".to_string(), "EnvironmentName".to_string()];
        let rendered = BTreeMap::from([("AppName".to_string(), "phonetool".to_string())]);
        let parameters = update_parameters(&existing, &declared, &rendered);
        let keys: Vec<Option<&str>> =
            parameters.iter().map(|parameter| parameter.parameter_key()).collect();
        assert_eq!(keys, vec![Some("AppName")]);
    }
}
