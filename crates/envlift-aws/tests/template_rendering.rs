//! Environment template rendering tests for envlift-aws.
// crates/envlift-aws/tests/template_rendering.rs
// =============================================================================
// Module: Template Rendering Tests
// Description: Validate placeholder substitution and parameter selection.
// Purpose: Ensure rendered upgrades carry exactly what the template declares.
// =============================================================================

#![allow(clippy::use_debug, reason = "Test-only failure messages print debug output.")]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use envlift_aws::DirectoryRenderer;
use envlift_core::AppName;
use envlift_core::EnvName;
use envlift_core::ImportedVpc;
use envlift_core::LegacyTemplater;
use envlift_core::NetworkOverride;
use envlift_core::StackError;
use envlift_core::Telemetry;
use envlift_core::TemplateVersion;
use envlift_core::UpgradeInput;
use envlift_core::extract_version;
use tempfile::TempDir;

type TestResult = Result<(), String>;

const VERSIONED: &str = "\
Metadata:
  Version: {{ version }}
Parameters:
  AppName:
    Type: String
  EnvironmentName:
    Type: String
  ImportedVPCID:
    Type: String
  ContainerInsights:
    Type: String
Resources:
  Bucket:
    Type: AWS::S3::BucketPolicy
    Properties:
      Bucket: '{{ artifact_bucket_arn }}'
      Secret: '{{resolve:ssm:/copilot/secret}}'
  EnvControllerAction:
    Properties:
      ServiceToken: '{{ custom_resource_url.EnvControllerFunction }}'
";

fn input(version: &str) -> Result<UpgradeInput, String> {
    Ok(UpgradeInput {
        version: TemplateVersion::parse(version).map_err(|err| err.to_string())?,
        app: AppName::new("phonetool"),
        app_domain: None,
        env: EnvName::new("test"),
        artifact_bucket_arn: "arn:aws:s3:::stackset-bucket".to_string(),
        artifact_bucket_key_arn: None,
        custom_resource_urls: BTreeMap::from([(
            "EnvControllerFunction".to_string(),
            "https://stackset-bucket.s3.us-west-2.amazonaws.com/envcontroller.zip".to_string(),
        )]),
        network: Some(NetworkOverride::Imported(ImportedVpc {
            id: "vpc-1".to_string(),
            public_subnet_ids: vec!["subnet-1".to_string()],
            private_subnet_ids: vec!["subnet-2".to_string()],
        })),
        import_cert_arns: Vec::new(),
        internal_alb_subnets: Vec::new(),
        allow_vpc_ingress: false,
        execution_role_arn: "arn:aws:iam::1:role/phonetool-test-CFNExecutionRole".to_string(),
        telemetry: Some(Telemetry {
            container_insights: true,
        }),
    })
}

fn write_template(root: &Path, name: &str, body: &str) -> TestResult {
    let dir = root.join("environment");
    fs::create_dir_all(&dir).map_err(|err| err.to_string())?;
    fs::write(dir.join(name), body).map_err(|err| err.to_string())
}

#[test]
fn placeholders_are_filled_and_dynamic_references_kept() -> TestResult {
    let root = TempDir::new().map_err(|err| err.to_string())?;
    write_template(root.path(), "v1.14.0.yml", VERSIONED)?;
    let renderer = DirectoryRenderer::new(root.path());

    let rendered = renderer.render(&input("v1.14.0")?, None).map_err(|err| err.to_string())?;

    let version = extract_version(&rendered.body).map_err(|err| err.to_string())?;
    if version.as_ref().map(ToString::to_string).as_deref() != Some("v1.14.0") {
        return Err(format!("unexpected version {version:?}"));
    }
    if !rendered.body.contains("Bucket: 'arn:aws:s3:::stackset-bucket'") {
        return Err("bucket arn not substituted".to_string());
    }
    if !rendered.body.contains("'{{resolve:ssm:/copilot/secret}}'") {
        return Err("dynamic reference was rewritten".to_string());
    }
    if !rendered.body.contains("envcontroller.zip") {
        return Err("custom resource url not substituted".to_string());
    }
    Ok(())
}

#[test]
fn only_declared_parameters_are_sent() -> TestResult {
    let root = TempDir::new().map_err(|err| err.to_string())?;
    write_template(root.path(), "v1.14.0.yml", VERSIONED)?;
    let renderer = DirectoryRenderer::new(root.path());

    let rendered = renderer.render(&input("v1.14.0")?, None).map_err(|err| err.to_string())?;

    let keys: Vec<&str> = rendered.parameters.keys().map(String::as_str).collect();
    if keys != ["AppName", "ContainerInsights", "EnvironmentName", "ImportedVPCID"] {
        return Err(format!("unexpected parameters {keys:?}"));
    }
    if rendered.parameters.get("ContainerInsights").map(String::as_str) != Some("enabled") {
        return Err("container insights not enabled".to_string());
    }
    Ok(())
}

#[test]
fn legacy_upgrades_carry_load_balanced_workloads() -> TestResult {
    let root = TempDir::new().map_err(|err| err.to_string())?;
    let body = "Metadata:\n  Version: {{ version }}\n\
                Parameters:\n  ALBWorkloads:\n    Type: String\n";
    write_template(root.path(), "v1.14.0.yml", body)?;
    let renderer = DirectoryRenderer::new(root.path());
    let workloads = vec!["frontend".to_string(), "admin".to_string()];

    let rendered = renderer
        .render(&input("v1.14.0")?, Some(workloads.as_slice()))
        .map_err(|err| err.to_string())?;

    if rendered.parameters.get("ALBWorkloads").map(String::as_str) != Some("frontend,admin") {
        return Err(format!("unexpected parameters {:?}", rendered.parameters));
    }
    Ok(())
}

#[test]
fn unknown_placeholder_fails_render() -> TestResult {
    let root = TempDir::new().map_err(|err| err.to_string())?;
    write_template(root.path(), "v1.14.0.yml", "Metadata:\n  Version: '{{ nope }}'\n")?;
    let renderer = DirectoryRenderer::new(root.path());

    match renderer.render(&input("v1.14.0")?, None) {
        Err(StackError::Render(message)) if message.contains("nope") => Ok(()),
        other => Err(format!("expected render error, got {other:?}")),
    }
}

#[test]
fn missing_version_template_fails_render() -> TestResult {
    let root = TempDir::new().map_err(|err| err.to_string())?;
    let renderer = DirectoryRenderer::new(root.path());

    match renderer.render(&input("v1.15.0")?, None) {
        Err(StackError::Render(message)) if message.contains("v1.15.0.yml") => Ok(()),
        other => Err(format!("expected render error, got {other:?}")),
    }
}

#[test]
fn legacy_template_is_read_verbatim() -> TestResult {
    let root = TempDir::new().map_err(|err| err.to_string())?;
    let body = "Parameters:\n  AppName:\n    Type: String\n";
    write_template(root.path(), "legacy.yml", body)?;
    let renderer = DirectoryRenderer::new(root.path());

    let template =
        renderer.default_template(&AppName::new("phonetool")).map_err(|err| err.to_string())?;

    if template != body {
        return Err(format!("unexpected legacy template {template:?}"));
    }
    Ok(())
}
