//! The work queue between the collection and processing stages.
//!
//! A FIFO hand-off with exactly one writer ([`QueueSender`]) and exactly one
//! reader ([`QueueReceiver`]); neither half is `Clone`. Both halves observe
//! the pipeline's [`CancellationToken`]: once it fires, `pop` returns `None`
//! even if items remain, and a `push` waiting for space on a full bounded
//! queue gives up.
//!
//! Full-queue policy: the producer waits (backpressure). Nothing is dropped.

use pipeline::CodeSample;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why a sample could not be pushed.
#[derive(Debug, Error)]
pub enum PushError {
    /// The pipeline is shutting down.
    #[error("work queue is shutting down")]
    ShuttingDown(Box<CodeSample>),

    /// The receiving half has been dropped.
    #[error("work queue receiver has been dropped")]
    Disconnected(Box<CodeSample>),
}

enum SenderInner {
    Bounded(mpsc::Sender<CodeSample>),
    Unbounded(mpsc::UnboundedSender<CodeSample>),
}

enum ReceiverInner {
    Bounded(mpsc::Receiver<CodeSample>),
    Unbounded(mpsc::UnboundedReceiver<CodeSample>),
}

/// Producer half of the work queue.
pub struct QueueSender {
    inner: SenderInner,
    cancel: CancellationToken,
}

/// Consumer half of the work queue.
pub struct QueueReceiver {
    inner: ReceiverInner,
    cancel: CancellationToken,
}

/// Creates a work queue. `capacity` of `None` makes it unbounded.
///
/// # Panics
///
/// Panics if `capacity` is `Some(0)`; [`pipeline::PipelineConfig::validate`]
/// rejects that value before a queue is ever built.
pub fn work_queue(
    capacity: Option<usize>,
    cancel: CancellationToken,
) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = match capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity);
            (SenderInner::Bounded(tx), ReceiverInner::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (SenderInner::Unbounded(tx), ReceiverInner::Unbounded(rx))
        }
    };
    (
        QueueSender {
            inner: tx,
            cancel: cancel.clone(),
        },
        QueueReceiver { inner: rx, cancel },
    )
}

impl QueueSender {
    /// Appends `sample` to the back of the queue.
    ///
    /// Waits for space when the queue is bounded and full.
    ///
    /// # Errors
    ///
    /// Returns the sample inside a [`PushError`] if the pipeline is shutting
    /// down or the receiver is gone.
    pub async fn push(&self, sample: CodeSample) -> Result<(), PushError> {
        if self.cancel.is_cancelled() {
            return Err(PushError::ShuttingDown(Box::new(sample)));
        }
        match &self.inner {
            SenderInner::Unbounded(tx) => tx
                .send(sample)
                .map_err(|e| PushError::Disconnected(Box::new(e.0))),
            SenderInner::Bounded(tx) => {
                let permit = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        return Err(PushError::ShuttingDown(Box::new(sample)));
                    }
                    permit = tx.reserve() => permit,
                };
                match permit {
                    Ok(permit) => {
                        permit.send(sample);
                        Ok(())
                    }
                    Err(_) => Err(PushError::Disconnected(Box::new(sample))),
                }
            }
        }
    }
}

impl QueueReceiver {
    /// Removes the sample at the front of the queue, waiting until one is
    /// available.
    ///
    /// Returns `None` once the pipeline is shutting down or the sender is gone
    /// and the queue is drained.
    pub async fn pop(&mut self) -> Option<CodeSample> {
        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            sample = self.recv() => sample,
        }
    }

    async fn recv(&mut self) -> Option<CodeSample> {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.recv().await,
            ReceiverInner::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Number of samples waiting to be popped.
    pub fn pending(&self) -> usize {
        match &self.inner {
            ReceiverInner::Bounded(rx) => rx.len(),
            ReceiverInner::Unbounded(rx) => rx.len(),
        }
    }
}
