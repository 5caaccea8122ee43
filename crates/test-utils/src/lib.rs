//! Shared fixtures for the `tierdag` test suites: plan and task builders,
//! a scripted [`TaskRunner`](tierdag::exec::TaskRunner) with a concurrency
//! probe, and tracing capture.

pub mod builders;
pub mod fake_runner;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tierdag::logging::LOG_ENV;
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single executor run in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Capture scheduler logs per test; they are shown only for failing tests.
///
/// The filter is read from `TIERDAG_LOG` (for example
/// `TIERDAG_LOG=tierdag::engine=debug`), defaulting to `tierdag=info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("tierdag=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it outlives [`TEST_TIMEOUT`]; a hung
/// executor shows up as a timeout instead of a stuck test binary.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("executor run exceeded {TEST_TIMEOUT:?}"))
}
