use super::input::HostInput;
use super::session::TrackingSession;
use crate::classify::ClassificationOutcome;
use crate::error::{ArSceneError, CommandError, Result};

use serde_json::Value;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const CLASSIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

enum RuntimeMessage {
    Input(HostInput),
    Command {
        method: String,
        arguments: Value,
        reply: oneshot::Sender<std::result::Result<Value, CommandError>>,
    },
}

/// Runs a [`TrackingSession`] on its own task, the single tracking context.
///
/// Host input arrives over a bounded channel in order. Classification
/// completions are re-queued onto the same task before they touch the scene.
pub struct SessionRuntime {
    sender: Option<mpsc::Sender<RuntimeMessage>>,
    cancellation: CancellationToken,
    task: Option<JoinHandle<TrackingSession>>,
}

impl SessionRuntime {
    /// Start the tracking task
    pub fn spawn(session: TrackingSession, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let cancellation = CancellationToken::new();

        let task = tokio::spawn(run_session(session, receiver, cancellation.clone()));
        info!("Tracking session runtime started");

        Self {
            sender: Some(sender),
            cancellation,
            task: Some(task),
        }
    }

    /// Queue one host input, waiting if the channel is full
    pub async fn send(&self, input: HostInput) -> Result<()> {
        let sender = self.sender()?;
        sender
            .send(RuntimeMessage::Input(input))
            .await
            .map_err(|_| ArSceneError::component("session_runtime", "tracking task has stopped"))
    }

    /// Issue a host command and wait for its reply
    pub async fn request(&self, method: &str, arguments: Value) -> Result<Value> {
        let sender = self.sender()?;
        let (reply, response) = oneshot::channel();

        sender
            .send(RuntimeMessage::Command {
                method: method.to_string(),
                arguments,
                reply,
            })
            .await
            .map_err(|_| ArSceneError::component("session_runtime", "tracking task has stopped"))?;

        let value = response.await.map_err(|_| {
            ArSceneError::component("session_runtime", "command dropped without reply")
        })??;
        Ok(value)
    }

    /// Stop immediately; queued input is discarded
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Finish queued input, tear the session down and hand it back
    pub async fn shutdown(mut self) -> Result<TrackingSession> {
        info!("Shutting down tracking session runtime");
        self.sender.take();

        let Some(mut task) = self.task.take() else {
            return Err(ArSceneError::system("Tracking task already joined"));
        };

        let joined = match timeout(SHUTDOWN_TIMEOUT, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    "Tracking task did not finish within {:?}, cancelling",
                    SHUTDOWN_TIMEOUT
                );
                self.cancellation.cancel();
                task.await
            }
        };

        joined.map_err(|e| {
            error!("Tracking task failed: {}", e);
            ArSceneError::system(format!("Tracking task failed: {}", e))
        })
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn sender(&self) -> Result<&mpsc::Sender<RuntimeMessage>> {
        self.sender
            .as_ref()
            .ok_or_else(|| ArSceneError::component("session_runtime", "runtime is shutting down"))
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancellation.cancel();
        }
    }
}

async fn run_session(
    mut session: TrackingSession,
    mut inputs: mpsc::Receiver<RuntimeMessage>,
    cancellation: CancellationToken,
) -> TrackingSession {
    debug!("Tracking task started");
    let mut results = session.take_classification_receiver();

    loop {
        tokio::select! {
            biased;

            _ = cancellation.cancelled() => {
                info!("Tracking task cancelled");
                break;
            }

            outcome = next_outcome(&mut results) => match outcome {
                Some(outcome) => session.apply_classification(outcome),
                None => {
                    debug!("Classification channel closed");
                    results = None;
                }
            },

            message = inputs.recv() => match message {
                Some(RuntimeMessage::Input(input)) => {
                    let kind = input.kind();
                    if let Err(e) = session.handle_input(input) {
                        debug!("Host {} rejected: {}", kind, e);
                    }
                }
                Some(RuntimeMessage::Command { method, arguments, reply }) => {
                    let response = session
                        .handle_input(HostInput::Command { method, arguments })
                        .map(|response| response.to_value());
                    if reply.send(response).is_err() {
                        debug!("Command caller went away before the reply");
                    }
                }
                None => {
                    info!("Host input closed");
                    drain_classifications(&mut session, results.as_mut()).await;
                    break;
                }
            },
        }

        // A fresh init starts a new completion channel
        if let Some(receiver) = session.take_classification_receiver() {
            results = Some(receiver);
        } else if !session.is_initialized() {
            results = None;
        }
    }

    session.teardown();
    session.stats().log_summary();
    debug!("Tracking task finished");
    session
}

async fn next_outcome(
    results: &mut Option<mpsc::UnboundedReceiver<ClassificationOutcome>>,
) -> Option<ClassificationOutcome> {
    match results {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn drain_classifications(
    session: &mut TrackingSession,
    results: Option<&mut mpsc::UnboundedReceiver<ClassificationOutcome>>,
) {
    let Some(results) = results else {
        return;
    };

    if session.pending_classifications() == 0 {
        return;
    }

    debug!(
        "Waiting for {} pending classifications",
        session.pending_classifications()
    );

    let drain = async {
        while session.pending_classifications() > 0 {
            match results.recv().await {
                Some(outcome) => session.apply_classification(outcome),
                None => break,
            }
        }
    };

    if timeout(CLASSIFICATION_DRAIN_TIMEOUT, drain).await.is_err() {
        warn!(
            "Discarding {} classifications still running after {:?}",
            session.pending_classifications(),
            CLASSIFICATION_DRAIN_TIMEOUT
        );
    }
}
