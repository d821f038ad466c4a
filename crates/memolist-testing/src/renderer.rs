use std::fmt::Debug;

use memolist_foundation::lazy::CellRenderer;
use memolist_foundation::ComputationFailed;

/// A single call made to a [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall<K, V> {
    Ready {
        index: usize,
        key: K,
        value: V,
        offset: f64,
    },
    Failed {
        index: usize,
        key: K,
        message: String,
        offset: f64,
    },
    Pending {
        index: usize,
        key: K,
        progress: Option<f32>,
        offset: f64,
    },
}

impl<K, V> RenderCall<K, V> {
    pub fn index(&self) -> usize {
        match self {
            RenderCall::Ready { index, .. }
            | RenderCall::Failed { index, .. }
            | RenderCall::Pending { index, .. } => *index,
        }
    }

    pub fn key(&self) -> &K {
        match self {
            RenderCall::Ready { key, .. }
            | RenderCall::Failed { key, .. }
            | RenderCall::Pending { key, .. } => key,
        }
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            RenderCall::Ready { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RenderCall::Ready { .. })
    }
}

/// Cell renderer that records every call and returns the call as its element.
#[derive(Debug)]
pub struct RecordingRenderer<K, V> {
    calls: Vec<RenderCall<K, V>>,
}

impl<K, V> Default for RecordingRenderer<K, V> {
    fn default() -> Self {
        Self { calls: Vec::new() }
    }
}

impl<K, V> RecordingRenderer<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call since creation or the last [`take`](Self::take).
    pub fn calls(&self) -> &[RenderCall<K, V>] {
        &self.calls
    }

    pub fn take(&mut self) -> Vec<RenderCall<K, V>> {
        std::mem::take(&mut self.calls)
    }

    pub fn rendered_indices(&self) -> Vec<usize> {
        self.calls.iter().map(RenderCall::index).collect()
    }

    pub fn rendered_keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.calls.iter().map(|call| call.key().clone()).collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl<K, V> CellRenderer<K, V> for RecordingRenderer<K, V>
where
    K: Clone + Debug,
    V: Clone,
{
    type Element = RenderCall<K, V>;

    fn render(&mut self, index: usize, key: &K, value: &V, offset: f64) -> Self::Element {
        self.record(RenderCall::Ready {
            index,
            key: key.clone(),
            value: value.clone(),
            offset,
        })
    }

    fn render_failed(
        &mut self,
        index: usize,
        key: &K,
        error: &ComputationFailed<K>,
        offset: f64,
    ) -> Self::Element {
        self.record(RenderCall::Failed {
            index,
            key: key.clone(),
            message: error.cause.to_string(),
            offset,
        })
    }

    fn render_pending(
        &mut self,
        index: usize,
        key: &K,
        progress: Option<f32>,
        offset: f64,
    ) -> Self::Element {
        self.record(RenderCall::Pending {
            index,
            key: key.clone(),
            progress,
            offset,
        })
    }
}

impl<K: Clone, V: Clone> RecordingRenderer<K, V> {
    fn record(&mut self, call: RenderCall<K, V>) -> RenderCall<K, V> {
        self.calls.push(call.clone());
        call
    }
}
