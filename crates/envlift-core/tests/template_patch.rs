// crates/envlift-core/tests/template_patch.rs
// ============================================================================
// Module: Template Inspector and Patch Tests
// Description: Version extraction, anchor lookup, and textual splice behavior.
// Purpose: Keep template patches position-preserving and fail closed on shape drift.
// Dependencies: envlift-core
// ============================================================================
//! ## Overview
//! Exercises the template inspector against realistic environment templates
//! and checks that the upload-permission splice leaves every original line in
//! place.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use envlift_core::SourcePosition;
use envlift_core::TemplateDocument;
use envlift_core::TemplateError;
use envlift_core::TemplateVersion;
use envlift_core::extract_version;
use envlift_core::locate_policy_statement_anchor;
use envlift_core::runtime::patcher::is_upload_permission_granted;
use envlift_core::runtime::splice_upload_permission;

const BUCKET_ARN: &str = "arn:aws:s3:::stackset-bucket";

const TEMPLATE: &str = r#"# Environment template
AWSTemplateFormatVersion: '2010-09-09'
Metadata:
  Version: v1.8.0
Parameters:
  AppName:
    Type: String
  EnvironmentName:
    Type: String
  ToolsAccountPrincipalARN:
    Type: String
Resources:
  EnvironmentManagerRole:
    Type: AWS::IAM::Role
    Properties:
      RoleName: !Sub ${AWS::StackName}-EnvManagerRole
      Policies:
      - PolicyName: root
        PolicyDocument:
          Version: '2012-10-17'
          Statement:
          - Sid: CloudwatchLogs # keep this comment
            Effect: Allow
            Action: ["logs:GetLogRecord", "logs:GetQueryResults"]
            Resource: "*"
          - Sid: ECS
            Effect: Allow
            Action: ecs:*
            Resource: "*"
Outputs:
  ManagerRole:
    Value: !GetAtt EnvironmentManagerRole.Arn
"#;

fn with_version(version: &str) -> String {
    TEMPLATE.replace("Version: v1.8.0", &format!("Version: {version}"))
}

#[test]
fn extracts_declared_version() {
    let version = extract_version(TEMPLATE).expect("parse").expect("version");
    assert_eq!(version, TemplateVersion::parse("v1.8.0").expect("parse"));
}

#[test]
fn missing_or_invalid_version_is_absent() {
    let without = TEMPLATE.replace("Metadata:\n  Version: v1.8.0\n", "");
    assert_eq!(extract_version(&without).expect("parse"), None);
    assert_eq!(extract_version(&with_version("1.8.0")).expect("parse"), None);
    assert_eq!(extract_version(&with_version("banana")).expect("parse"), None);
}

#[test]
fn malformed_document_is_a_parse_error() {
    let err = extract_version("Resources: [unclosed\n").expect_err("parse error");
    assert!(matches!(err, TemplateError::Parse { .. }));
}

#[test]
fn sufficiency_follows_threshold() {
    assert!(!is_upload_permission_granted(TEMPLATE).expect("check"));
    assert!(!is_upload_permission_granted(&with_version("v1.8.5")).expect("check"));
    assert!(is_upload_permission_granted(&with_version("v1.9.0")).expect("check"));
    assert!(is_upload_permission_granted(&with_version("v1.9.1")).expect("check"));
    let without = TEMPLATE.replace("Metadata:\n  Version: v1.8.0\n", "");
    assert!(!is_upload_permission_granted(&without).expect("check"));
}

#[test]
fn anchor_points_at_statement_list() {
    let anchor = locate_policy_statement_anchor(TEMPLATE).expect("anchor");
    assert_eq!(
        anchor,
        SourcePosition {
            line: 22,
            column: 11
        }
    );
    let line = TEMPLATE.split('\n').nth(anchor.line - 1).expect("line");
    assert_eq!(&line[anchor.column - 1 ..], "- Sid: CloudwatchLogs # keep this comment");
}

#[test]
fn anchor_missing_when_role_has_no_policies() {
    let body = "Resources:\n  EnvironmentManagerRole:\n    Type: AWS::IAM::Role\n";
    let err = locate_policy_statement_anchor(body).expect_err("no anchor");
    assert!(matches!(err, TemplateError::AnchorNotFound { .. }));
}

#[test]
fn declared_parameters_are_in_source_order() {
    let document = TemplateDocument::parse(TEMPLATE).expect("parse");
    assert_eq!(
        document.declared_parameters(),
        vec!["AppName", "EnvironmentName", "ToolsAccountPrincipalARN"]
    );
}

#[test]
fn splice_preserves_surrounding_lines() {
    let anchor = locate_policy_statement_anchor(TEMPLATE).expect("anchor");
    let patched = splice_upload_permission(TEMPLATE, BUCKET_ARN).expect("splice");
    let original: Vec<&str> = TEMPLATE.split('\n').collect();
    let lines: Vec<&str> = patched.split('\n').collect();
    let before = anchor.line - 1;

    assert_eq!(lines[.. before], original[.. before]);
    assert_eq!(lines[before + 8 ..], original[before ..]);
    assert_eq!(lines[before], "          - Sid: PatchPutObjectsToArtifactBucket");
    assert_eq!(lines[before + 6], format!("              - {BUCKET_ARN}"));
    assert_eq!(lines[before + 7], format!("              - {BUCKET_ARN}/*"));
}

#[test]
fn spliced_template_still_parses_with_new_statement_first() {
    let patched = splice_upload_permission(TEMPLATE, BUCKET_ARN).expect("splice");
    let anchor = locate_policy_statement_anchor(&patched).expect("anchor");
    let original_anchor = locate_policy_statement_anchor(TEMPLATE).expect("anchor");
    assert_eq!(anchor, original_anchor);
    assert_eq!(
        extract_version(&patched).expect("parse"),
        extract_version(TEMPLATE).expect("parse")
    );
    assert!(patched.contains("# keep this comment"));
}

#[test]
fn spliced_indentless_statement_list_is_valid_yaml() {
    let body = "Metadata:\n  Version: v1.8.0\nResources:\n  EnvironmentManagerRole:\n    \
                Properties:\n      Policies:\n        - PolicyName: root\n          \
                PolicyDocument:\n            Statement:\n            - Sid: Logs\n              \
                Effect: Allow\n";
    let patched = splice_upload_permission(body, BUCKET_ARN).expect("splice");
    TemplateDocument::parse(&patched).expect("patched template parses");

    let anchor = locate_policy_statement_anchor(&patched).expect("anchor");
    assert_eq!(
        anchor,
        SourcePosition {
            line: 10,
            column: 13
        }
    );
    let first = patched.split('\n').nth(anchor.line - 1).expect("line");
    assert_eq!(first, "            - Sid: PatchPutObjectsToArtifactBucket");
    assert!(patched.contains("            - Sid: Logs\n"));
}

#[test]
fn indented_statement_list_anchor_is_the_dash() {
    let body = "Resources:\n  EnvironmentManagerRole:\n    Properties:\n      Policies:\n        \
                - PolicyName: root\n          PolicyDocument:\n            \
                Statement:\n              - Sid: Logs\n                Effect: Allow\n";
    let anchor = locate_policy_statement_anchor(body).expect("anchor");
    assert_eq!(
        anchor,
        SourcePosition {
            line: 8,
            column: 15
        }
    );
    let patched = splice_upload_permission(body, BUCKET_ARN).expect("splice");
    TemplateDocument::parse(&patched).expect("patched template parses");
}
