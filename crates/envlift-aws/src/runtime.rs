// crates/envlift-aws/src/runtime.rs
// ============================================================================
// Module: envlift AWS Runtime Bridge
// Description: Owned tokio runtime used to drive async SDK calls synchronously.
// Purpose: Let synchronous collaborator traits call the async AWS SDK.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`AwsRuntime`] owns a multi-threaded tokio runtime shared by every client.
//! When a call arrives from inside another runtime, the future runs on that
//! runtime where possible instead of nesting `block_on`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use envlift_core::DiscoveryError;
use envlift_core::StackError;
use envlift_core::StoreError;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure of the runtime itself rather than of a remote call.
#[derive(Debug, Clone, Error)]
#[error("aws runtime error: {0}")]
pub struct BridgeError(pub String);

impl From<BridgeError> for StackError {
    fn from(value: BridgeError) -> Self {
        Self::Backend(value.to_string())
    }
}

impl From<BridgeError> for StoreError {
    fn from(value: BridgeError) -> Self {
        Self::Backend(value.to_string())
    }
}

impl From<BridgeError> for DiscoveryError {
    fn from(value: BridgeError) -> Self {
        Self::Backend(value.to_string())
    }
}

impl From<BridgeError> for String {
    fn from(value: BridgeError) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Shared runtime handle for SDK calls.
#[derive(Debug, Clone)]
pub struct AwsRuntime {
    /// Owned runtime; taken on drop.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for AwsRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl AwsRuntime {
    /// Creates a new multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] when the runtime cannot be started.
    pub fn new() -> Result<Self, BridgeError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("envlift-aws")
            .build()
            .map_err(|err| BridgeError(err.to_string()))?;
        Ok(Self {
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Runs `future` to completion and returns its result.
    ///
    /// # Errors
    ///
    /// Returns the future's error, or a [`BridgeError`] conversion when the
    /// runtime is unavailable.
    pub fn block_on<F, T, E>(&self, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<BridgeError> + Send + 'static,
    {
        if let Ok(handle) = Handle::try_current() {
            if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
                return tokio::task::block_in_place(|| handle.block_on(future));
            }
            let runtime = self.runtime()?.clone();
            let (tx, rx) = std::sync::mpsc::sync_channel(1);
            std::thread::spawn(move || {
                let _ = tx.send(runtime.block_on(future));
            });
            return rx.recv().unwrap_or_else(|_| {
                Err(BridgeError("aws runtime thread join failed".to_string()).into())
            });
        }
        self.runtime()?.block_on(future)
    }

    /// Returns the runtime or an error once it has been released.
    fn runtime(&self) -> Result<&Arc<Runtime>, BridgeError> {
        self.runtime.as_ref().ok_or_else(|| BridgeError("aws runtime closed".to_string()))
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
    fn block_on_returns_future_result() {
        let runtime = AwsRuntime::new().expect("runtime");
        let value: Result<u32, BridgeError> = runtime.block_on(async { Ok(7) });
        assert_eq!(value.expect("value"), 7);
    }

    #[test]
    fn block_on_propagates_errors() {
        let runtime = AwsRuntime::new().expect("runtime");
        let value: Result<(), StackError> =
            runtime.block_on(async { Err(StackError::Backend("boom".to_string())) });
        assert!(matches!(value, Err(StackError::Backend(message)) if message == "boom"));
    }

    #[test]
    fn bridge_errors_convert_to_collaborator_errors() {
        let error: StoreError = BridgeError("closed".to_string()).into();
        assert_eq!(error.to_string(), "configuration store error: aws runtime error: closed");
    }
}
