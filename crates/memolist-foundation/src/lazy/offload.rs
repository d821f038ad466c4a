//! Message-passing contract for offloaded derived-value computations.
//!
//! Expensive `compute` calls can run outside the render loop. A request
//! carries the identity, the input fingerprint and a payload; responses come
//! back as results, progress notifications or errors, possibly out of order.
//! [`OffloadDispatcher`] matches them by identity and coalesces duplicate
//! requests so the pending set never exceeds one entry per identity.

use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use indexmap::IndexMap;
use memolist_core::collections::map::BuildHasher;
use memolist_core::Fingerprint;
use web_time::Instant;

use crate::error::{ComputeError, OffloadError};

/// Names the handler a request is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationKind(&'static str);

impl ComputationKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComputationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Work sent to an offload worker.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputeRequest<K, P> {
    pub kind: ComputationKind,
    pub key: K,
    /// Fingerprint of the inputs the payload was built from.
    pub fingerprint: Fingerprint,
    pub payload: P,
}

/// Message sent back by an offload worker.
#[derive(Clone, Debug, PartialEq)]
pub enum ComputeResponse<K, V> {
    Result {
        key: K,
        fingerprint: Fingerprint,
        value: V,
        duration_ms: f64,
    },
    Progress {
        key: K,
        fingerprint: Fingerprint,
        percent: f32,
    },
    Error {
        key: K,
        fingerprint: Fingerprint,
        message: String,
    },
}

impl<K, V> ComputeResponse<K, V> {
    pub fn key(&self) -> &K {
        match self {
            ComputeResponse::Result { key, .. }
            | ComputeResponse::Progress { key, .. }
            | ComputeResponse::Error { key, .. } => key,
        }
    }
}

/// Transport between the dispatcher and a worker.
///
/// Implemented by [`OffloadWorker`](super::OffloadWorker) for a background
/// thread; tests can plug in an in-memory queue.
pub trait OffloadChannel<K, P, V> {
    /// Queues a request. Must not block on the computation.
    fn submit(&mut self, request: ComputeRequest<K, P>) -> Result<(), OffloadError>;

    /// Returns the next response if one is ready.
    fn try_recv(&mut self) -> Option<ComputeResponse<K, V>>;

    /// Waits up to `timeout` for the next response.
    ///
    /// The default implementation does not block.
    fn recv_timeout(&mut self, timeout: Duration) -> Option<ComputeResponse<K, V>> {
        let _ = timeout;
        self.try_recv()
    }
}

/// What happened to a dispatch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A new request was sent to the worker.
    Submitted,
    /// The same identity and fingerprint were already pending.
    Coalesced,
}

/// A finished offloaded computation that is still current.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion<K, V> {
    Ready {
        key: K,
        fingerprint: Fingerprint,
        value: V,
        duration_ms: f64,
    },
    Failed {
        key: K,
        fingerprint: Fingerprint,
        error: ComputeError,
    },
}

impl<K, V> Completion<K, V> {
    pub fn key(&self) -> &K {
        match self {
            Completion::Ready { key, .. } | Completion::Failed { key, .. } => key,
        }
    }
}

#[derive(Debug)]
struct PendingRequest {
    kind: ComputationKind,
    fingerprint: Fingerprint,
    percent: f32,
    submitted_at: Instant,
}

/// Tracks in-flight requests and matches responses by identity.
///
/// At most one request per identity is pending. Requesting the same identity
/// and fingerprint again is coalesced; requesting it with a new fingerprint
/// supersedes the older request, whose late response is then dropped.
pub struct OffloadDispatcher<K, P, V, C> {
    channel: C,
    pending: IndexMap<K, PendingRequest, BuildHasher>,
    _marker: PhantomData<fn(P) -> V>,
}

impl<K, P, V, C> OffloadDispatcher<K, P, V, C>
where
    K: Clone + Eq + Hash + Debug,
    C: OffloadChannel<K, P, V>,
{
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            pending: IndexMap::with_hasher(BuildHasher::default()),
            _marker: PhantomData,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Sends `request` unless an identical one is already pending.
    pub fn request(
        &mut self,
        request: ComputeRequest<K, P>,
    ) -> Result<RequestOutcome, OffloadError> {
        if self.is_pending_with(&request.key, request.fingerprint) {
            log::debug!("coalesced offload request for {:?}", request.key);
            return Ok(RequestOutcome::Coalesced);
        }

        let key = request.key.clone();
        let pending = PendingRequest {
            kind: request.kind,
            fingerprint: request.fingerprint,
            percent: 0.0,
            submitted_at: Instant::now(),
        };
        self.channel.submit(request)?;
        if let Some(previous) = self.pending.insert(key.clone(), pending) {
            log::debug!(
                "offload request for {:?} supersedes {} request with {:?}",
                key,
                previous.kind,
                previous.fingerprint
            );
        }
        Ok(RequestOutcome::Submitted)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Whether a request for exactly this identity and fingerprint is in flight.
    pub fn is_pending_with(&self, key: &K, fingerprint: Fingerprint) -> bool {
        self.pending
            .get(key)
            .is_some_and(|pending| pending.fingerprint == fingerprint)
    }

    /// Last reported progress for a pending identity, in percent.
    pub fn progress(&self, key: &K) -> Option<f32> {
        self.pending.get(key).map(|pending| pending.percent)
    }

    /// Time since the pending request for `key` was submitted.
    pub fn pending_for(&self, key: &K) -> Option<Duration> {
        self.pending.get(key).map(|pending| pending.submitted_at.elapsed())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending identities in submission order.
    pub fn pending_keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.pending.keys()
    }

    /// Drains every response that is ready right now.
    pub fn poll(&mut self) -> Vec<Completion<K, V>> {
        let mut completions = Vec::new();
        while let Some(response) = self.channel.try_recv() {
            self.accept(response, &mut completions);
        }
        completions
    }

    /// Waits up to `timeout` for the first response, then drains the rest.
    pub fn poll_timeout(&mut self, timeout: Duration) -> Vec<Completion<K, V>> {
        let mut completions = Vec::new();
        if self.pending.is_empty() {
            return completions;
        }
        let deadline = Instant::now() + timeout;
        while completions.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.channel.recv_timeout(remaining) {
                Some(response) => self.accept(response, &mut completions),
                None => break,
            }
        }
        completions.extend(self.poll());
        completions
    }

    fn accept(&mut self, response: ComputeResponse<K, V>, completions: &mut Vec<Completion<K, V>>) {
        match response {
            ComputeResponse::Progress {
                key,
                fingerprint,
                percent,
            } => {
                if let Some(pending) = self.pending.get_mut(&key) {
                    if pending.fingerprint == fingerprint {
                        pending.percent = percent.clamp(0.0, 100.0);
                        log::trace!("offload progress for {:?}: {:.0}%", key, pending.percent);
                    }
                }
            }
            ComputeResponse::Result {
                key,
                fingerprint,
                value,
                duration_ms,
            } => {
                if self.take_pending(&key, fingerprint) {
                    completions.push(Completion::Ready {
                        key,
                        fingerprint,
                        value,
                        duration_ms,
                    });
                } else {
                    log::debug!("dropping superseded offload result for {:?}", key);
                }
            }
            ComputeResponse::Error {
                key,
                fingerprint,
                message,
            } => {
                if self.take_pending(&key, fingerprint) {
                    completions.push(Completion::Failed {
                        key,
                        fingerprint,
                        error: ComputeError::new(message),
                    });
                } else {
                    log::debug!("dropping superseded offload error for {:?}", key);
                }
            }
        }
    }

    fn take_pending(&mut self, key: &K, fingerprint: Fingerprint) -> bool {
        if self.is_pending_with(key, fingerprint) {
            self.pending.shift_remove(key);
            true
        } else {
            false
        }
    }
}

/// Item-level view of an offload pipeline, as used by the render
/// coordinator.
pub trait OffloadBackend<T, K, V> {
    /// Requests the derived value of `item` unless it is already pending.
    fn request(
        &mut self,
        key: &K,
        fingerprint: Fingerprint,
        item: &T,
    ) -> Result<RequestOutcome, OffloadError>;

    /// Drains finished computations without blocking.
    fn poll(&mut self) -> Vec<Completion<K, V>>;

    /// Waits up to `timeout` for at least one finished computation.
    fn poll_timeout(&mut self, timeout: Duration) -> Vec<Completion<K, V>>;

    fn is_pending(&self, key: &K) -> bool;

    fn progress(&self, key: &K) -> Option<f32>;

    fn pending_len(&self) -> usize;
}

/// Binds a dispatcher to a computation kind and a payload builder.
pub struct OffloadBinding<T, K, P, V, C> {
    dispatcher: OffloadDispatcher<K, P, V, C>,
    kind: ComputationKind,
    payload: Box<dyn Fn(&T) -> P>,
}

impl<T, K, P, V, C> OffloadBinding<T, K, P, V, C>
where
    K: Clone + Eq + Hash + Debug,
    C: OffloadChannel<K, P, V>,
{
    pub fn new(
        dispatcher: OffloadDispatcher<K, P, V, C>,
        kind: ComputationKind,
        payload: impl Fn(&T) -> P + 'static,
    ) -> Self {
        Self {
            dispatcher,
            kind,
            payload: Box::new(payload),
        }
    }

    pub fn dispatcher(&self) -> &OffloadDispatcher<K, P, V, C> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut OffloadDispatcher<K, P, V, C> {
        &mut self.dispatcher
    }
}

impl<T, K, P, V, C> OffloadBackend<T, K, V> for OffloadBinding<T, K, P, V, C>
where
    K: Clone + Eq + Hash + Debug,
    C: OffloadChannel<K, P, V>,
{
    fn request(
        &mut self,
        key: &K,
        fingerprint: Fingerprint,
        item: &T,
    ) -> Result<RequestOutcome, OffloadError> {
        // Skip building the payload when the request would be coalesced.
        if self.dispatcher.is_pending_with(key, fingerprint) {
            return Ok(RequestOutcome::Coalesced);
        }
        self.dispatcher.request(ComputeRequest {
            kind: self.kind,
            key: key.clone(),
            fingerprint,
            payload: (self.payload)(item),
        })
    }

    fn poll(&mut self) -> Vec<Completion<K, V>> {
        self.dispatcher.poll()
    }

    fn poll_timeout(&mut self, timeout: Duration) -> Vec<Completion<K, V>> {
        self.dispatcher.poll_timeout(timeout)
    }

    fn is_pending(&self, key: &K) -> bool {
        self.dispatcher.is_pending(key)
    }

    fn progress(&self, key: &K) -> Option<f32> {
        self.dispatcher.progress(key)
    }

    fn pending_len(&self) -> usize {
        self.dispatcher.pending_len()
    }
}
