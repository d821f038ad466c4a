//! Background-thread offload worker.
//!
//! Runs registered handlers on a dedicated thread and talks to the dispatcher
//! over channels only; no memory is shared with the render loop. Dropping the
//! worker closes the request channel and joins the thread.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use memolist_core::collections::map::HashMap;
use memolist_core::Fingerprint;
use web_time::Instant;

use super::offload::{ComputationKind, ComputeRequest, ComputeResponse, OffloadChannel};
use crate::error::{ComputeError, OffloadError};

/// Lets a handler report partial progress for the request it is serving.
pub struct ProgressReporter<'a, K, V> {
    responses: &'a Sender<ComputeResponse<K, V>>,
    key: &'a K,
    fingerprint: Fingerprint,
}

impl<K: Clone, V> ProgressReporter<'_, K, V> {
    /// Reports progress in percent, clamped to `[0, 100]`.
    pub fn report(&self, percent: f32) {
        // The dispatcher may already be gone; progress is best effort.
        let _ = self.responses.send(ComputeResponse::Progress {
            key: self.key.clone(),
            fingerprint: self.fingerprint,
            percent: percent.clamp(0.0, 100.0),
        });
    }
}

type Handler<K, P, V> =
    Box<dyn Fn(&P, &ProgressReporter<'_, K, V>) -> Result<V, ComputeError> + Send>;

/// Builder for an [`OffloadWorker`].
pub struct WorkerBuilder<K, P, V> {
    name: String,
    handlers: HashMap<ComputationKind, Handler<K, P, V>>,
}

impl<K, P, V> Default for WorkerBuilder<K, P, V>
where
    K: Clone + Send + 'static,
    P: Send + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P, V> WorkerBuilder<K, P, V>
where
    K: Clone + Send + 'static,
    P: Send + 'static,
    V: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            name: "memolist-offload".to_string(),
            handlers: HashMap::default(),
        }
    }

    /// Thread name, visible in debuggers and panic messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers the handler for `kind`, replacing any previous one.
    pub fn handler<F>(mut self, kind: ComputationKind, handler: F) -> Self
    where
        F: Fn(&P, &ProgressReporter<'_, K, V>) -> Result<V, ComputeError> + Send + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Starts the worker thread.
    pub fn spawn(self) -> Result<OffloadWorker<K, P, V>, OffloadError> {
        let (request_tx, request_rx) = mpsc::channel::<ComputeRequest<K, P>>();
        let (response_tx, response_rx) = mpsc::channel::<ComputeResponse<K, V>>();
        let handlers = self.handlers;

        let thread = std::thread::Builder::new()
            .name(self.name)
            .spawn(move || serve(handlers, request_rx, response_tx))?;

        Ok(OffloadWorker {
            requests: Some(request_tx),
            responses: response_rx,
            thread: Some(thread),
        })
    }
}

fn serve<K, P, V>(
    handlers: HashMap<ComputationKind, Handler<K, P, V>>,
    requests: Receiver<ComputeRequest<K, P>>,
    responses: Sender<ComputeResponse<K, V>>,
) where
    K: Clone,
{
    for request in requests {
        let started = Instant::now();
        let ComputeRequest {
            kind,
            key,
            fingerprint,
            payload,
        } = request;

        let response = match handlers.get(&kind) {
            Some(handler) => {
                let progress = ProgressReporter {
                    responses: &responses,
                    key: &key,
                    fingerprint,
                };
                match handler(&payload, &progress) {
                    Ok(value) => ComputeResponse::Result {
                        key,
                        fingerprint,
                        value,
                        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
                    },
                    Err(error) => ComputeResponse::Error {
                        key,
                        fingerprint,
                        message: error.to_string(),
                    },
                }
            }
            None => {
                log::warn!("offload worker has no handler for computation kind `{}`", kind);
                ComputeResponse::Error {
                    key,
                    fingerprint,
                    message: format!("unknown computation kind `{kind}`"),
                }
            }
        };

        if responses.send(response).is_err() {
            break;
        }
    }
}

/// Handle to a running offload worker thread.
pub struct OffloadWorker<K, P, V> {
    requests: Option<Sender<ComputeRequest<K, P>>>,
    responses: Receiver<ComputeResponse<K, V>>,
    thread: Option<JoinHandle<()>>,
}

impl<K, P, V> OffloadWorker<K, P, V> {
    /// Stops accepting requests and waits for the in-flight one to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("offload worker thread panicked");
            }
        }
    }
}

impl<K, P, V> OffloadChannel<K, P, V> for OffloadWorker<K, P, V> {
    fn submit(&mut self, request: ComputeRequest<K, P>) -> Result<(), OffloadError> {
        let sender = self.requests.as_ref().ok_or(OffloadError::Disconnected)?;
        sender.send(request).map_err(|_| OffloadError::Disconnected)
    }

    fn try_recv(&mut self) -> Option<ComputeResponse<K, V>> {
        self.responses.try_recv().ok()
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Option<ComputeResponse<K, V>> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl<K, P, V> Drop for OffloadWorker<K, P, V> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOUBLE: ComputationKind = ComputationKind::new("double");
    const FAIL: ComputationKind = ComputationKind::new("fail");
    const TIMEOUT: Duration = Duration::from_secs(5);

    fn worker() -> OffloadWorker<u32, u64, u64> {
        WorkerBuilder::new()
            .handler(DOUBLE, |payload: &u64, progress: &ProgressReporter<'_, u32, u64>| {
                progress.report(50.0);
                Ok(payload * 2)
            })
            .handler(FAIL, |_: &u64, _: &ProgressReporter<'_, u32, u64>| {
                Err(ComputeError::new("refused"))
            })
            .spawn()
            .unwrap()
    }

    fn request(kind: ComputationKind, key: u32, payload: u64) -> ComputeRequest<u32, u64> {
        ComputeRequest {
            kind,
            key,
            fingerprint: Fingerprint::of(&payload),
            payload,
        }
    }

    fn next_final(worker: &mut OffloadWorker<u32, u64, u64>) -> ComputeResponse<u32, u64> {
        loop {
            let response = worker.recv_timeout(TIMEOUT).expect("worker response");
            if !matches!(response, ComputeResponse::Progress { .. }) {
                return response;
            }
        }
    }

    #[test]
    fn test_result_round_trip() {
        let mut worker = worker();
        worker.submit(request(DOUBLE, 1, 21)).unwrap();

        let first = worker.recv_timeout(TIMEOUT).unwrap();
        assert!(matches!(
            first,
            ComputeResponse::Progress { key: 1, percent, .. } if percent == 50.0
        ));

        match next_final(&mut worker) {
            ComputeResponse::Result { key, value, duration_ms, .. } => {
                assert_eq!(key, 1);
                assert_eq!(value, 42);
                assert!(duration_ms >= 0.0);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_handler_error_is_reported() {
        let mut worker = worker();
        worker.submit(request(FAIL, 2, 0)).unwrap();

        assert_eq!(
            next_final(&mut worker),
            ComputeResponse::Error {
                key: 2,
                fingerprint: Fingerprint::of(&0u64),
                message: "refused".into(),
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let mut worker = worker();
        worker
            .submit(request(ComputationKind::new("fibonacci"), 3, 40))
            .unwrap();

        match next_final(&mut worker) {
            ComputeResponse::Error { key, message, .. } => {
                assert_eq!(key, 3);
                assert_eq!(message, "unknown computation kind `fibonacci`");
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_shutdown_joins_thread() {
        let mut worker = worker();
        worker.submit(request(DOUBLE, 4, 1)).unwrap();
        worker.shutdown();
    }
}
