// crates/envlift-aws/src/lib.rs
// ============================================================================
// Module: envlift AWS Library
// Description: AWS-backed collaborators for the environment upgrader.
// Purpose: Connect the upgrade runtime to SSM, CloudFormation, S3, and STS.
// Dependencies: crate::{cloudformation, factory, renderer, runtime, s3_store, session, ssm_store}
// ============================================================================

//! ## Overview
//! Every collaborator implements a synchronous trait from `envlift-core` and
//! drives the async AWS SDK through one shared [`AwsRuntime`]. The default
//! [`AwsSession`] reads the configuration store and discovers regional
//! resources; environment-scoped clients come from [`AwsClientFactory`],
//! which assumes each environment's manager role.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cloudformation;
pub mod factory;
pub mod renderer;
pub mod runtime;
pub mod s3_store;
pub mod session;
pub mod ssm_store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cloudformation::CfnResourceDiscovery;
pub use cloudformation::CfnStackClient;
pub use cloudformation::CfnVersionDescriber;
pub use cloudformation::WaitSettings;
pub use factory::AwsClientFactory;
pub use renderer::DirectoryRenderer;
pub use renderer::RenderedTemplate;
pub use runtime::AwsRuntime;
pub use runtime::BridgeError;
pub use s3_store::S3ObjectStore;
pub use session::AwsSession;
pub use session::SessionSettings;
pub use ssm_store::SsmConfigStore;
