// crates/envlift-core/tests/upgrade_orchestrator.rs
// ============================================================================
// Module: Upgrade Orchestrator Tests
// Description: End-to-end upgrade runs against in-memory collaborators.
// Purpose: Validate step ordering, skip decisions, legacy branches, and aborts.
// Dependencies: envlift-core
// ============================================================================
//! ## Overview
//! Drives [`EnvironmentUpgrader`] with in-memory stores and clients and
//! inspects what each collaborator recorded.

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

use envlift_core::AppName;
use envlift_core::ApplicationRecord;
use envlift_core::ArtifactBucket;
use envlift_core::CustomConfig;
use envlift_core::CustomResource;
use envlift_core::EnvName;
use envlift_core::EnvironmentOutcome;
use envlift_core::EnvironmentRecord;
use envlift_core::EnvironmentUpgrader;
use envlift_core::ImportedVpc;
use envlift_core::NamedBinary;
use envlift_core::NetworkOverride;
use envlift_core::ProgressEvent;
use envlift_core::ResourceSet;
use envlift_core::StackError;
use envlift_core::StoreError;
use envlift_core::Telemetry;
use envlift_core::TemplateDocument;
use envlift_core::TemplateVersion;
use envlift_core::UpgradeError;
use envlift_core::UpgradeRequest;
use envlift_core::UpgradeTarget;
use envlift_core::UpgraderConfig;
use envlift_core::WorkloadRecord;
use envlift_core::WorkloadType;
use envlift_core::locate_policy_statement_anchor;
use envlift_core::runtime::InMemoryClientFactory;
use envlift_core::runtime::InMemoryConfigStore;
use envlift_core::runtime::InMemoryObjectStore;
use envlift_core::runtime::InMemoryResourceDiscovery;
use envlift_core::runtime::InMemoryStackClient;
use envlift_core::runtime::InMemoryVersionDescriber;
use envlift_core::runtime::LegacyError;
use envlift_core::runtime::PatchError;
use envlift_core::runtime::RecordingProgressSink;
use envlift_core::runtime::StaticLegacyTemplater;
use envlift_core::runtime::memory::ProgressRecord;
use envlift_core::runtime::memory::RecordedUpgrade;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const APP: &str = "phonetool";
const REGION: &str = "us-west-2";
const BUCKET: &str = "stackset-phonetool-bucket";

const BODY: &str = r#"Parameters:
  AppName:
    Type: String
Resources:
  EnvironmentManagerRole:
    Type: AWS::IAM::Role
    Properties:
      Policies:
      - PolicyName: root
        PolicyDocument:
          Version: '2012-10-17'
          Statement:
          - Sid: CloudwatchLogs
            Effect: Allow
            Action: logs:*
            Resource: "*"
"#;

type Upgrader = EnvironmentUpgrader<
    InMemoryConfigStore,
    InMemoryResourceDiscovery,
    StaticLegacyTemplater,
    InMemoryClientFactory,
    RecordingProgressSink,
>;

fn versioned_template(version: &str) -> String {
    format!("Metadata:\n  Version: {version}\n{BODY}")
}

fn env_record(name: &str) -> EnvironmentRecord {
    EnvironmentRecord {
        app: AppName::new(APP),
        name: EnvName::new(name),
        region: REGION.to_string(),
        manager_role_arn: format!("arn:aws:iam::111:role/{APP}-{name}-EnvManagerRole"),
        execution_role_arn: format!("arn:aws:iam::111:role/{APP}-{name}-CFNExecutionRole"),
        custom_config: None,
        telemetry: None,
    }
}

fn store(envs: Vec<EnvironmentRecord>) -> InMemoryConfigStore {
    let mut store = InMemoryConfigStore::new().with_application(ApplicationRecord {
        name: AppName::new(APP),
        domain: None,
    });
    for env in envs {
        store = store.with_environment(env);
    }
    store
        .with_workload(WorkloadRecord {
            app: AppName::new(APP),
            name: "frontend".to_string(),
            workload_type: WorkloadType::LoadBalancedWebService,
        })
        .with_workload(WorkloadRecord {
            app: AppName::new(APP),
            name: "api".to_string(),
            workload_type: WorkloadType::BackendService,
        })
}

fn resources() -> ResourceSet {
    ResourceSet::new(vec![
        CustomResource::new("CertificateValidation", vec![NamedBinary::new("index.js", "a")]),
        CustomResource::new("DNSDelegation", vec![NamedBinary::new("index.js", "b")]),
    ])
}

struct Harness {
    stack: InMemoryStackClient,
    objects: InMemoryObjectStore,
    progress: RecordingProgressSink,
    upgrader: Upgrader,
}

fn harness(
    envs: Vec<EnvironmentRecord>,
    stack: InMemoryStackClient,
    describers: Vec<(&str, InMemoryVersionDescriber)>,
    canonical: &str,
) -> Harness {
    let objects = InMemoryObjectStore::new();
    let progress = RecordingProgressSink::new();
    let mut factory = InMemoryClientFactory::new(stack.clone(), objects.clone());
    for (env, describer) in describers {
        factory = factory.with_describer(env, describer);
    }
    let discovery = InMemoryResourceDiscovery::new().with_bucket(
        REGION,
        ArtifactBucket {
            name: BUCKET.to_string(),
            kms_key_arn: Some("arn:aws:kms:us-west-2:111:key/abc".to_string()),
        },
    );
    let upgrader = EnvironmentUpgrader::new(
        store(envs),
        discovery,
        StaticLegacyTemplater::new(canonical),
        factory,
        progress.clone(),
        resources(),
        UpgraderConfig::default(),
    );
    Harness {
        stack,
        objects,
        progress,
        upgrader,
    }
}

fn named(env: &str) -> UpgradeRequest {
    UpgradeRequest {
        app: AppName::new(APP),
        target: UpgradeTarget::Named(EnvName::new(env)),
    }
}

fn version(raw: &str) -> TemplateVersion {
    TemplateVersion::parse(raw).expect("version")
}

fn assert_upload_statement_first(body: &str) {
    TemplateDocument::parse(body).expect("patched template parses");
    let anchor = locate_policy_statement_anchor(body).expect("anchor");
    let line = body.split('\n').nth(anchor.line - 1).expect("anchor line");
    assert_eq!(&line[anchor.column - 1 ..], "- Sid: PatchPutObjectsToArtifactBucket");
}

// ============================================================================
// SECTION: Versioned Upgrades
// ============================================================================

#[test]
fn prod_upgrade_skips_patch_and_submits_versioned_input() {
    let stack = InMemoryStackClient::new().with_template("prod", versioned_template("v1.9.0"));
    let h = harness(
        vec![env_record("prod")],
        stack,
        vec![("prod", InMemoryVersionDescriber::new("v1.9.0"))],
        BODY,
    );

    let report = h.upgrader.execute(&named("prod")).expect("upgrade");

    assert_eq!(report.target, version("v1.14.0"));
    assert_eq!(
        report.environments[0].outcome,
        EnvironmentOutcome::Upgraded {
            from: version("v1.9.0"),
            to: version("v1.14.0"),
        }
    );
    assert!(h.stack.updates().is_empty());
    let uploads = h.objects.uploads();
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|upload| upload.bucket == BUCKET));

    let upgrades = h.stack.upgrades();
    assert_eq!(upgrades.len(), 1);
    let RecordedUpgrade::Versioned(input) = &upgrades[0] else {
        panic!("expected versioned upgrade, got {:?}", upgrades[0]);
    };
    assert_eq!(input.version, version("v1.14.0"));
    assert_eq!(input.artifact_bucket_arn, format!("arn:aws:s3:::{BUCKET}"));
    assert_eq!(input.artifact_bucket_key_arn.as_deref(), Some("arn:aws:kms:us-west-2:111:key/abc"));
    assert_eq!(input.custom_resource_urls.len(), 2);
    assert!(input.custom_resource_urls["DNSDelegation"].starts_with("memory://"));
    assert!(input.is_uncustomized());
    assert_eq!(input.execution_role_arn, env_record("prod").execution_role_arn);
}

#[test]
fn progress_is_bracketed_once_per_attempt() {
    let stack = InMemoryStackClient::new().with_template("prod", versioned_template("v1.9.0"));
    let h = harness(
        vec![env_record("prod")],
        stack,
        vec![("prod", InMemoryVersionDescriber::new("v1.9.0"))],
        BODY,
    );
    h.upgrader.execute(&named("prod")).expect("upgrade");
    assert_eq!(
        h.progress.records(),
        vec![
            ProgressRecord::Start(ProgressEvent::UpgradeStarted {
                env: EnvName::new("prod"),
                from: version("v1.9.0"),
                to: version("v1.14.0"),
            }),
            ProgressRecord::Stop(ProgressEvent::UpgradeCompleted {
                env: EnvName::new("prod"),
                to: version("v1.14.0"),
            }),
        ]
    );
}

#[test]
fn stored_customizations_flow_into_versioned_input() {
    let mut env = env_record("prod");
    env.custom_config = Some(CustomConfig {
        network: Some(NetworkOverride::Imported(ImportedVpc {
            id: "vpc-123".to_string(),
            public_subnet_ids: vec!["subnet-1".to_string()],
            private_subnet_ids: vec!["subnet-2".to_string()],
        })),
        import_cert_arns: vec!["arn:aws:acm:cert".to_string()],
        internal_alb_subnets: vec!["subnet-2".to_string()],
        allow_vpc_ingress: true,
    });
    env.telemetry = Some(Telemetry {
        container_insights: true,
    });
    let stack = InMemoryStackClient::new().with_template("prod", versioned_template("v1.10.0"));
    let describers = vec![("prod", InMemoryVersionDescriber::new("v1.10.0"))];
    let h = harness(vec![env], stack, describers, BODY);

    h.upgrader.execute(&named("prod")).expect("upgrade");

    let upgrades = h.stack.upgrades();
    let input = upgrades[0].input();
    assert!(matches!(&input.network, Some(NetworkOverride::Imported(vpc)) if vpc.id == "vpc-123"));
    assert_eq!(input.import_cert_arns, vec!["arn:aws:acm:cert".to_string()]);
    assert_eq!(input.internal_alb_subnets, vec!["subnet-2".to_string()]);
    assert!(input.allow_vpc_ingress);
    assert_eq!(
        input.telemetry,
        Some(Telemetry {
            container_insights: true
        })
    );
}

#[test]
fn up_to_date_and_newer_environments_are_skipped() {
    let stack = InMemoryStackClient::new()
        .with_template("test", versioned_template("v1.14.0"))
        .with_template("prod", versioned_template("v1.15.0"));
    let h = harness(
        vec![env_record("test"), env_record("prod")],
        stack,
        vec![
            ("test", InMemoryVersionDescriber::new("v1.14.0")),
            ("prod", InMemoryVersionDescriber::new("v1.15.0")),
        ],
        BODY,
    );
    let request = UpgradeRequest {
        app: AppName::new(APP),
        target: UpgradeTarget::All,
    };

    let report = h.upgrader.execute(&request).expect("upgrade");

    assert_eq!(report.environments[0].outcome, EnvironmentOutcome::UpToDate);
    assert_eq!(
        report.environments[1].outcome,
        EnvironmentOutcome::VersionSkew {
            current: version("v1.15.0")
        }
    );
    assert!(h.stack.upgrades().is_empty());
    assert_eq!(
        h.progress.records(),
        vec![ProgressRecord::Notice(ProgressEvent::VersionSkew {
            env: EnvName::new("prod"),
            current: version("v1.15.0"),
            target: version("v1.14.0"),
        })]
    );
}

// ============================================================================
// SECTION: Permission Patch
// ============================================================================

#[test]
fn older_template_is_patched_before_upgrade() {
    let stack = InMemoryStackClient::new().with_template("test", versioned_template("v1.8.0"));
    let h = harness(
        vec![env_record("test")],
        stack,
        vec![("test", InMemoryVersionDescriber::new("v1.8.0"))],
        BODY,
    );

    h.upgrader.execute(&named("test")).expect("upgrade");

    let updates = h.stack.updates();
    assert_eq!(updates.len(), 1);
    assert!(updates[0].body.contains("- Sid: PatchPutObjectsToArtifactBucket"));
    assert!(updates[0].body.contains(&format!("- arn:aws:s3:::{BUCKET}/*")));
    assert_eq!(updates[0].execution_role_arn, env_record("test").execution_role_arn);
    assert_upload_statement_first(&updates[0].body);

    let records = h.progress.records();
    assert_eq!(records.len(), 4);
    assert_eq!(
        records[0],
        ProgressRecord::Start(ProgressEvent::PatchingPermissions {
            env: EnvName::new("test")
        })
    );
    assert_eq!(
        records[1],
        ProgressRecord::Stop(ProgressEvent::PermissionsPatched {
            env: EnvName::new("test")
        })
    );
    assert_eq!(h.stack.upgrades().len(), 1);
}

#[test]
fn empty_change_set_counts_as_patched() {
    let stack = InMemoryStackClient::new()
        .with_template("test", versioned_template("v1.8.0"))
        .with_update_error(StackError::EmptyChangeSet {
            stack: "phonetool-test".to_string(),
        });
    let h = harness(
        vec![env_record("test")],
        stack,
        vec![("test", InMemoryVersionDescriber::new("v1.8.0"))],
        BODY,
    );

    h.upgrader.execute(&named("test")).expect("upgrade");

    assert_eq!(h.stack.upgrades().len(), 1);
    assert!(h.progress.records().contains(&ProgressRecord::Stop(
        ProgressEvent::PermissionsPatched {
            env: EnvName::new("test")
        }
    )));
}

#[test]
fn failed_patch_aborts_before_publishing() {
    let stack = InMemoryStackClient::new()
        .with_template("test", versioned_template("v1.8.0"))
        .with_update_error(StackError::Backend("access denied".to_string()));
    let h = harness(
        vec![env_record("test")],
        stack,
        vec![("test", InMemoryVersionDescriber::new("v1.8.0"))],
        BODY,
    );

    let err = h.upgrader.execute(&named("test")).expect_err("patch failure");

    assert!(matches!(
        err,
        UpgradeError::Patch(PatchError::Update {
            source: StackError::Backend(_)
        })
    ));
    assert!(h.objects.uploads().is_empty());
    assert!(h.stack.upgrades().is_empty());
    assert_eq!(
        h.progress.records().last(),
        Some(&ProgressRecord::Stop(ProgressEvent::PermissionPatchFailed {
            env: EnvName::new("test")
        }))
    );
}

#[test]
fn template_without_statement_list_fails_closed() {
    let stack = InMemoryStackClient::new()
        .with_template("test", "Metadata:\n  Version: v1.8.0\nResources: {}\n");
    let h = harness(
        vec![env_record("test")],
        stack,
        vec![("test", InMemoryVersionDescriber::new("v1.8.0"))],
        BODY,
    );

    let err = h.upgrader.execute(&named("test")).expect_err("anchor");

    assert!(matches!(err, UpgradeError::Patch(PatchError::Template { .. })));
    assert!(h.stack.updates().is_empty());
}

// ============================================================================
// SECTION: Legacy Upgrades
// ============================================================================

#[test]
fn default_legacy_environment_upgrades_with_stock_input() {
    let stack = InMemoryStackClient::new().with_template("test", BODY);
    let h = harness(
        vec![env_record("test")],
        stack,
        vec![("test", InMemoryVersionDescriber::new("v0.0.0"))],
        BODY,
    );

    h.upgrader.execute(&named("test")).expect("upgrade");

    let updates = h.stack.updates();
    assert_eq!(updates.len(), 1);
    assert_upload_statement_first(&updates[0].body);
    let upgrades = h.stack.upgrades();
    let RecordedUpgrade::Legacy {
        input,
        lb_workloads,
    } = &upgrades[0]
    else {
        panic!("expected legacy upgrade, got {:?}", upgrades[0]);
    };
    assert_eq!(lb_workloads, &vec!["frontend".to_string()]);
    assert!(input.is_uncustomized());
    assert_eq!(input.version, version("v1.14.0"));
}

#[test]
fn customized_legacy_environment_uses_stored_configuration() {
    let deployed = BODY.replace("CloudwatchLogs", "CloudwatchLogz");
    let mut env = env_record("test");
    env.custom_config = Some(CustomConfig {
        network: Some(NetworkOverride::Imported(ImportedVpc {
            id: "vpc-abc".to_string(),
            public_subnet_ids: vec!["subnet-a".to_string()],
            private_subnet_ids: vec!["subnet-b".to_string()],
        })),
        ..CustomConfig::default()
    });
    let stack = InMemoryStackClient::new().with_template("test", deployed);
    let describers = vec![("test", InMemoryVersionDescriber::new("v0.0.0"))];
    let h = harness(vec![env], stack, describers, BODY);

    h.upgrader.execute(&named("test")).expect("upgrade");

    let upgrades = h.stack.upgrades();
    assert!(matches!(&upgrades[0], RecordedUpgrade::Legacy { .. }));
    assert!(matches!(
        &upgrades[0].input().network,
        Some(NetworkOverride::Imported(vpc)) if vpc.id == "vpc-abc"
    ));
}

#[test]
fn customized_legacy_environment_without_stored_configuration_fails() {
    let deployed = BODY.replace("CloudwatchLogs", "CloudwatchLogz");
    let stack = InMemoryStackClient::new().with_template("test", deployed);
    let h = harness(
        vec![env_record("test")],
        stack,
        vec![("test", InMemoryVersionDescriber::new("v0.0.0"))],
        BODY,
    );

    let err = h.upgrader.execute(&named("test")).expect_err("missing config");

    assert!(matches!(err, UpgradeError::Legacy(LegacyError::MissingVpcConfiguration { .. })));
    assert!(h.stack.upgrades().is_empty());
    assert_eq!(
        h.progress.records().last(),
        Some(&ProgressRecord::Stop(ProgressEvent::UpgradeFailed {
            env: EnvName::new("test"),
            to: version("v1.14.0"),
        }))
    );
}

// ============================================================================
// SECTION: Failures
// ============================================================================

#[test]
fn first_failure_aborts_remaining_environments() {
    let stack = InMemoryStackClient::new()
        .with_template("test", versioned_template("v1.9.0"))
        .with_template("prod", versioned_template("v1.9.0"));
    let h = harness(
        vec![env_record("test"), env_record("prod")],
        stack,
        vec![
            ("test", InMemoryVersionDescriber::new("v1.9.0")),
            (
                "prod",
                InMemoryVersionDescriber::failing(StackError::Backend("throttled".to_string())),
            ),
        ],
        BODY,
    );
    let request = UpgradeRequest {
        app: AppName::new(APP),
        target: UpgradeTarget::All,
    };

    let err = h.upgrader.execute(&request).expect_err("second env fails");

    assert!(matches!(err, UpgradeError::DescribeVersion { ref env, .. } if env.as_str() == "prod"));
    let upgrades = h.stack.upgrades();
    assert_eq!(upgrades.len(), 1);
    assert_eq!(upgrades[0].input().env, EnvName::new("test"));
}

#[test]
fn version_skew_advisory_survives_later_failure() {
    let stack = InMemoryStackClient::new()
        .with_template("test", versioned_template("v1.20.0"))
        .with_template("prod", versioned_template("v1.9.0"));
    let h = harness(
        vec![env_record("test"), env_record("prod")],
        stack,
        vec![
            ("test", InMemoryVersionDescriber::new("v1.20.0")),
            (
                "prod",
                InMemoryVersionDescriber::failing(StackError::Backend("throttled".to_string())),
            ),
        ],
        BODY,
    );
    let request = UpgradeRequest {
        app: AppName::new(APP),
        target: UpgradeTarget::All,
    };

    h.upgrader.execute(&request).expect_err("second env fails");

    assert_eq!(
        h.progress.records(),
        vec![ProgressRecord::Notice(ProgressEvent::VersionSkew {
            env: EnvName::new("test"),
            current: version("v1.20.0"),
            target: version("v1.14.0"),
        })]
    );
}

#[test]
fn upgrade_failure_is_reported_with_versions() {
    let stack = InMemoryStackClient::new()
        .with_template("prod", versioned_template("v1.9.0"))
        .with_upgrade_error("prod", StackError::Backend("rollback".to_string()));
    let h = harness(
        vec![env_record("prod")],
        stack,
        vec![("prod", InMemoryVersionDescriber::new("v1.9.0"))],
        BODY,
    );

    let err = h.upgrader.execute(&named("prod")).expect_err("upgrade failure");

    assert_eq!(
        err.to_string(),
        "upgrade environment prod from version v1.9.0 to version v1.14.0: stack service error: \
         rollback"
    );
    assert_eq!(
        h.progress.records().last(),
        Some(&ProgressRecord::Stop(ProgressEvent::UpgradeFailed {
            env: EnvName::new("prod"),
            to: version("v1.14.0"),
        }))
    );
}

#[test]
fn missing_environment_is_returned_unchanged() {
    let h = harness(vec![env_record("test")], InMemoryStackClient::new(), Vec::new(), BODY);

    let err = h.upgrader.validate(&named("staging")).expect_err("not found");

    let UpgradeError::Store(StoreError::EnvironmentNotFound {
        env, ..
    }) = err
    else {
        panic!("expected environment not found, got {err:?}");
    };
    assert_eq!(env.as_str(), "staging");
}

#[test]
fn malformed_reported_version_is_rejected() {
    let stack = InMemoryStackClient::new().with_template("prod", versioned_template("v1.9.0"));
    let h = harness(
        vec![env_record("prod")],
        stack,
        vec![("prod", InMemoryVersionDescriber::new("latest"))],
        BODY,
    );

    let err = h.upgrader.execute(&named("prod")).expect_err("malformed");

    assert!(matches!(err, UpgradeError::MalformedVersion { .. }));
    assert!(h.stack.upgrades().is_empty());
}
