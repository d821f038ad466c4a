use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use memolist_core::Fingerprint;
use memolist_foundation::lazy::{ComputeRequest, ComputeResponse, OffloadChannel};
use memolist_foundation::OffloadError;

struct Shared<K, P, V> {
    submitted: Vec<ComputeRequest<K, P>>,
    responses: VecDeque<ComputeResponse<K, V>>,
    disconnected: bool,
}

/// In-memory offload channel whose responses are scripted by the test.
///
/// The channel is moved into a dispatcher; the [`ManualChannelHandle`]
/// returned by [`handle`](Self::handle) stays with the test to inspect
/// submissions and deliver responses in any order.
pub struct ManualChannel<K, P, V> {
    shared: Rc<RefCell<Shared<K, P, V>>>,
}

/// Test-side end of a [`ManualChannel`].
pub struct ManualChannelHandle<K, P, V> {
    shared: Rc<RefCell<Shared<K, P, V>>>,
}

impl<K, P, V> Default for ManualChannel<K, P, V> {
    fn default() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                submitted: Vec::new(),
                responses: VecDeque::new(),
                disconnected: false,
            })),
        }
    }
}

impl<K, P, V> ManualChannel<K, P, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> ManualChannelHandle<K, P, V> {
        ManualChannelHandle {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<K, P, V> OffloadChannel<K, P, V> for ManualChannel<K, P, V> {
    fn submit(&mut self, request: ComputeRequest<K, P>) -> Result<(), OffloadError> {
        let mut shared = self.shared.borrow_mut();
        if shared.disconnected {
            return Err(OffloadError::Disconnected);
        }
        shared.submitted.push(request);
        Ok(())
    }

    fn try_recv(&mut self) -> Option<ComputeResponse<K, V>> {
        self.shared.borrow_mut().responses.pop_front()
    }
}

impl<K: Clone, P: Clone, V> ManualChannelHandle<K, P, V> {
    /// Every request submitted so far, oldest first.
    pub fn submitted(&self) -> Vec<ComputeRequest<K, P>> {
        self.shared.borrow().submitted.clone()
    }

    pub fn submitted_keys(&self) -> Vec<K> {
        self.shared
            .borrow()
            .submitted
            .iter()
            .map(|request| request.key.clone())
            .collect()
    }

    pub fn submitted_len(&self) -> usize {
        self.shared.borrow().submitted.len()
    }

    /// Queues a raw response for the next poll.
    pub fn respond(&self, response: ComputeResponse<K, V>) {
        self.shared.borrow_mut().responses.push_back(response);
    }

    /// Answers the `n`th submitted request with `value`.
    ///
    /// # Panics
    /// If fewer than `n + 1` requests were submitted.
    pub fn complete_nth(&self, n: usize, value: V) {
        let (key, fingerprint) = self.request_identity(n);
        self.respond(ComputeResponse::Result {
            key,
            fingerprint,
            value,
            duration_ms: 0.0,
        });
    }

    /// Fails the `n`th submitted request with `message`.
    ///
    /// # Panics
    /// If fewer than `n + 1` requests were submitted.
    pub fn fail_nth(&self, n: usize, message: &str) {
        let (key, fingerprint) = self.request_identity(n);
        self.respond(ComputeResponse::Error {
            key,
            fingerprint,
            message: message.to_string(),
        });
    }

    /// Answers every submitted request, in reverse order, with `value_of`.
    pub fn complete_all_reversed(&self, value_of: impl Fn(&ComputeRequest<K, P>) -> V) {
        let responses: Vec<_> = self
            .shared
            .borrow()
            .submitted
            .iter()
            .rev()
            .map(|request| ComputeResponse::Result {
                key: request.key.clone(),
                fingerprint: request.fingerprint,
                value: value_of(request),
                duration_ms: 0.0,
            })
            .collect();
        self.shared.borrow_mut().responses.extend(responses);
    }

    /// Makes every further submission fail with [`OffloadError::Disconnected`].
    pub fn disconnect(&self) {
        self.shared.borrow_mut().disconnected = true;
    }

    fn request_identity(&self, n: usize) -> (K, Fingerprint) {
        let shared = self.shared.borrow();
        let request = &shared.submitted[n];
        (request.key.clone(), request.fingerprint)
    }
}
