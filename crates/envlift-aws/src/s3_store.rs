// crates/envlift-aws/src/s3_store.rs
// ============================================================================
// Module: envlift S3 Object Store
// Description: Zip packaging and upload of custom resources to the artifact bucket.
// Purpose: Implement the object store over S3.
// Dependencies: aws-sdk-s3, envlift-core, zip
// ============================================================================

//! ## Overview
//! Custom resources are packaged as deflated zip archives in memory and
//! uploaded under their content-addressed key. The returned URL is the
//! virtual-hosted S3 URL the environment template references.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Cursor;
use std::io::Write;

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use envlift_core::NamedBinary;
use envlift_core::ObjectStore;
use envlift_core::ObjectStoreError;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::runtime::AwsRuntime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Content type of uploaded archives.
const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

// ============================================================================
// SECTION: Packaging
// ============================================================================

/// Packages `files` into a deflated zip archive.
///
/// # Errors
///
/// Returns a message when an entry cannot be written.
pub fn zip_files(files: &[NamedBinary]) -> Result<Vec<u8>, String> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in files {
        zip.start_file(file.name.as_str(), options)
            .map_err(|err| format!("add {} to archive: {err}", file.name))?;
        zip.write_all(&file.content)
            .map_err(|err| format!("write {} to archive: {err}", file.name))?;
    }
    let cursor = zip.finish().map_err(|err| format!("finalize archive: {err}"))?;
    Ok(cursor.into_inner())
}

/// Returns the virtual-hosted URL of an object.
#[must_use]
pub fn object_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com/{key}")
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// S3-backed object store.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    /// S3 client.
    client: Client,
    /// Shared runtime.
    runtime: AwsRuntime,
    /// Region the client is pinned to.
    region: String,
}

impl S3ObjectStore {
    /// Creates an object store in `region`.
    #[must_use]
    pub fn new(client: Client, runtime: AwsRuntime, region: impl Into<String>) -> Self {
        Self {
            client,
            runtime,
            region: region.into(),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn zip_and_upload(
        &self,
        bucket: &str,
        key: &str,
        files: &[NamedBinary],
    ) -> Result<String, ObjectStoreError> {
        let archive = zip_files(files).map_err(|message| ObjectStoreError::Package {
            key: key.to_string(),
            message,
        })?;
        let client = self.client.clone();
        let (bucket_name, object_key) = (bucket.to_string(), key.to_string());
        let uploaded: Result<(), String> = self.runtime.block_on(async move {
            client
                .put_object()
                .bucket(bucket_name)
                .key(object_key)
                .content_type(ARCHIVE_CONTENT_TYPE)
                .body(ByteStream::from(archive))
                .send()
                .await
                .map_err(|err| err.into_service_error().to_string())?;
            Ok(())
        });
        uploaded.map_err(|message| ObjectStoreError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        })?;
        debug!(bucket = %bucket, key = %key, "uploaded custom resource archive");
        Ok(object_url(bucket, &self.region, key))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
