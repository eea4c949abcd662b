pub mod builders;

use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};
use xasl_run::engine::{ChannelEvent, ChannelMessage};

pub use builders::{PipelineInstall, RunRequestBuilder, StudyBuilder};
#[cfg(unix)]
pub use builders::{shell_script, UnreadableDir};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=xasl_run=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    with_timeout_secs(5, f).await
}

pub async fn with_timeout_secs<F, T>(secs: u64, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(secs), f)
        .await
        .unwrap_or_else(|_| panic!("Test timed out after {secs} seconds"))
}

/// Receive events until the run's `ChildProcessHasClosed` (inclusive) or
/// until the channel closes. Panics after `timeout`.
pub async fn collect_until_closed(
    rx: &mut mpsc::Receiver<ChannelMessage>,
    timeout: Duration,
) -> Vec<ChannelEvent> {
    let collect = async {
        let mut events = Vec::new();
        while let Some(message) = rx.recv().await {
            let closed = message.event.is_closed();
            events.push(message.event);
            if closed {
                break;
            }
        }
        events
    };
    tokio::time::timeout(timeout, collect)
        .await
        .expect("run did not close in time")
}

/// Drain whatever is already queued on the channel without waiting.
pub fn drain_ready(rx: &mut mpsc::Receiver<ChannelMessage>) -> Vec<ChannelEvent> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        events.push(message.event);
    }
    events
}
