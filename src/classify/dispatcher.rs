use super::classifier::{Classification, Classifier};
use crate::error::{ArSceneError, ClassifierError, Result};
use crate::frame::CameraImage;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Completed classification, delivered back to the tracking context
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    /// Dispatcher that produced this outcome
    pub generation: u64,
    /// Submission order, for logging only; outcomes arrive in completion order
    pub sequence: u64,
    pub result: std::result::Result<Classification, ClassifierError>,
}

/// Counters describing dispatcher activity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatcherStats {
    pub submitted: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    discarded: AtomicU64,
}

/// Runs classifications on the tokio runtime and hands completions back over a channel.
///
/// `submit` never waits on the classifier. Completions are only ever sent as
/// messages; the receiver side applies them on the tracking context.
pub struct ClassificationDispatcher {
    classifier: Arc<dyn Classifier>,
    results: mpsc::UnboundedSender<ClassificationOutcome>,
    limiter: Option<Arc<Semaphore>>,
    cancellation: CancellationToken,
    runtime: Handle,
    generation: u64,
    next_sequence: u64,
    counters: Arc<Counters>,
}

impl ClassificationDispatcher {
    /// Create a dispatcher on the current tokio runtime.
    ///
    /// `max_in_flight` caps concurrent requests; submissions beyond the cap are dropped.
    /// Every outcome is tagged with `generation` so a receiver can tell dispatchers apart.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        max_in_flight: Option<usize>,
        generation: u64,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClassificationOutcome>)> {
        let runtime = Handle::try_current().map_err(|e| {
            ArSceneError::component("classification_dispatcher", e.to_string().as_str())
        })?;

        let (results, receiver) = mpsc::unbounded_channel();

        match max_in_flight {
            Some(limit) => info!(
                "Classification dispatcher using '{}' with at most {} requests in flight",
                classifier.name(),
                limit
            ),
            None => info!(
                "Classification dispatcher using '{}' with unbounded fan-out",
                classifier.name()
            ),
        }

        Ok((
            Self {
                classifier,
                results,
                limiter: max_in_flight.map(|limit| Arc::new(Semaphore::new(limit))),
                cancellation: CancellationToken::new(),
                runtime,
                generation,
                next_sequence: 0,
                counters: Arc::new(Counters::default()),
            },
            receiver,
        ))
    }

    /// Schedule `image` for classification. Returns the sequence number, or `None` when dropped.
    pub fn submit(&mut self, image: CameraImage) -> Option<u64> {
        if self.cancellation.is_cancelled() {
            debug!("Dispatcher cancelled, dropping classification request");
            return None;
        }

        let permit = match &self.limiter {
            Some(limiter) => match Arc::clone(limiter).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!("Classification limit reached, dropping request");
                    return None;
                }
            },
            None => None,
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let classifier = Arc::clone(&self.classifier);
        let results = self.results.clone();
        let cancellation = self.cancellation.clone();
        let counters = Arc::clone(&self.counters);
        let generation = self.generation;

        self.runtime.spawn(async move {
            let result = classifier.classify(image).await;
            drop(permit);

            if cancellation.is_cancelled() {
                debug!("Discarding classification {} for torn-down session", sequence);
                counters.discarded.fetch_add(1, Ordering::Relaxed);
                return;
            }

            let outcome = ClassificationOutcome {
                generation,
                sequence,
                result,
            };
            if results.send(outcome).is_err() {
                debug!("Result receiver gone, discarding classification {}", sequence);
                counters.discarded.fetch_add(1, Ordering::Relaxed);
                return;
            }

            counters.delivered.fetch_add(1, Ordering::Relaxed);
        });

        debug!("Submitted classification {}", sequence);
        Some(sequence)
    }

    /// Stop delivering results; requests already running finish and are discarded
    pub fn cancel(&self) {
        if !self.cancellation.is_cancelled() {
            warn!("Cancelling classification dispatcher");
            self.cancellation.cancel();
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Free request slots, when a cap is configured
    pub fn available_slots(&self) -> Option<usize> {
        self.limiter.as_ref().map(|limiter| limiter.available_permits())
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ClassificationDispatcher {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
