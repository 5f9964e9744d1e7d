//! Altus E2E Test Harness
//!
//! The integration tests in this crate configure a real `AltusProvider`
//! against an in-process mock of the platform API and walk full resource
//! lifecycles through it. The mock serves the same `/iaas/api` surface the
//! SDK client speaks: login, request tracking, and per-resource CRUD, with
//! every mutation answered by a tracked request that stays `IN_PROGRESS`
//! for a scripted number of polls before settling.

pub mod error;
pub mod server;

pub use error::{E2eError, E2eResult};
pub use server::MockPlatform;

use tracing_subscriber::EnvFilter;

/// Install a tracing subscriber for test output. Safe to call from every
/// test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
