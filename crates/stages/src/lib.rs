//! Code Monster pipeline stages.
//!
//! This crate runs the learning pipeline defined by the [`pipeline`] crate:
//! the work queue between the two background stages, the collection and
//! processing loops themselves, the driver for the repair state machine, and
//! the [`Orchestrator`] that owns their lifecycle.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between the business logic
//! in [`pipeline`] and the oracle traits. They contain no domain rules of
//! their own: what counts as processed, how a merge is made atomic, and when
//! the repair loop terminates are all decided in [`pipeline`].
//!
//! ## Concurrency
//!
//! Two long-lived Tokio tasks (collection, processing) communicate only
//! through the [`queue`]. Cancellation is a single
//! [`tokio_util::sync::CancellationToken`] observed by the queue, the
//! collection interval sleep, and every in-flight oracle call. Every oracle
//! call is bounded by the configured oracle timeout, and a panicking oracle
//! surfaces as a failed call rather than unwinding the stage task.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use pipeline::{OracleError, OracleKind};

pub mod collector;
pub mod orchestrator;
pub mod processor;
pub mod queue;
pub mod repair;

pub use collector::{CollectionStage, SweepSummary};
pub use orchestrator::Orchestrator;
pub use processor::{ProcessingStage, ProcessorExit, SampleOutcome};
pub use queue::{work_queue, PushError, QueueReceiver, QueueSender};
pub use repair::{RepairLoop, RepairReport};

/// Runs `call` under `timeout`, mapping expiry to [`OracleError::TimedOut`]
/// and a panic inside the oracle to [`OracleError::Failed`].
pub(crate) async fn bounded<T>(
    timeout: Duration,
    oracle: OracleKind,
    call: impl Future<Output = Result<T, OracleError>>,
) -> Result<T, OracleError> {
    let guarded = AssertUnwindSafe(call).catch_unwind();
    match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => Err(OracleError::failed(
            oracle,
            format!("panicked: {}", panic_message(&*payload)),
        )),
        Err(_) => Err(OracleError::TimedOut {
            oracle,
            after: timeout,
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
