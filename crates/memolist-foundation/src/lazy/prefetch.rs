//! Prefetch scheduling for windowed lists.
//!
//! Warms the derived-value cache for items just past the render window in the
//! direction of travel, so that the next scroll step finds its values ready.
//! Prefetched items are never rendered.

use std::collections::VecDeque;
use std::ops::Range;

use super::viewport::ScrollDirection;

/// Strategy for prefetching derived values beyond the render window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefetchStrategy {
    /// Number of items to prefetch past the window edge.
    /// Default is 2.
    pub prefetch_count: usize,

    /// Whether prefetching is enabled.
    pub enabled: bool,
}

impl Default for PrefetchStrategy {
    fn default() -> Self {
        Self {
            prefetch_count: 2,
            enabled: true,
        }
    }
}

impl PrefetchStrategy {
    /// Creates a new prefetch strategy with the specified count.
    pub fn new(prefetch_count: usize) -> Self {
        Self {
            prefetch_count,
            enabled: true,
        }
    }

    /// Disables prefetching.
    pub fn disabled() -> Self {
        Self {
            prefetch_count: 0,
            enabled: false,
        }
    }
}

/// Queue of view indices to warm after a render pass.
#[derive(Debug, Default)]
pub struct PrefetchScheduler {
    /// Indices to prefetch, nearest to the window first.
    queue: VecDeque<usize>,
}

impl PrefetchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the queue for a window covering `window` (half-open) over
    /// `item_count` items.
    pub fn update(
        &mut self,
        window: Range<usize>,
        item_count: usize,
        direction: ScrollDirection,
        strategy: &PrefetchStrategy,
    ) {
        self.queue.clear();
        if !strategy.enabled || window.is_empty() {
            return;
        }

        match direction {
            ScrollDirection::Forward => {
                let end = window.end.saturating_add(strategy.prefetch_count).min(item_count);
                self.queue.extend(window.end..end);
            }
            ScrollDirection::Backward => {
                let start = window.start.saturating_sub(strategy.prefetch_count);
                self.queue.extend((start..window.start).rev());
            }
        }
    }

    /// Returns the next index to prefetch, if any.
    pub fn next_prefetch(&mut self) -> Option<usize> {
        self.queue.pop_front()
    }

    /// Returns all pending prefetch indices.
    pub fn pending(&self) -> &VecDeque<usize> {
        &self.queue
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefetch_forward_scroll() {
        let mut scheduler = PrefetchScheduler::new();
        let strategy = PrefetchStrategy::new(2);

        scheduler.update(5..11, 100, ScrollDirection::Forward, &strategy);

        assert_eq!(scheduler.next_prefetch(), Some(11));
        assert_eq!(scheduler.next_prefetch(), Some(12));
        assert_eq!(scheduler.next_prefetch(), None);
    }

    #[test]
    fn test_prefetch_backward_scroll() {
        let mut scheduler = PrefetchScheduler::new();
        let strategy = PrefetchStrategy::new(2);

        scheduler.update(5..11, 100, ScrollDirection::Backward, &strategy);

        assert_eq!(scheduler.next_prefetch(), Some(4));
        assert_eq!(scheduler.next_prefetch(), Some(3));
        assert_eq!(scheduler.next_prefetch(), None);
    }

    #[test]
    fn test_prefetch_at_end() {
        let mut scheduler = PrefetchScheduler::new();
        let strategy = PrefetchStrategy::new(2);

        scheduler.update(95..100, 100, ScrollDirection::Forward, &strategy);

        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_prefetch_near_start_backward() {
        let mut scheduler = PrefetchScheduler::new();
        let strategy = PrefetchStrategy::new(3);

        scheduler.update(1..6, 100, ScrollDirection::Backward, &strategy);

        assert_eq!(scheduler.pending().iter().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_prefetch_disabled() {
        let mut scheduler = PrefetchScheduler::new();
        let strategy = PrefetchStrategy::disabled();

        scheduler.update(5..11, 100, ScrollDirection::Forward, &strategy);

        assert_eq!(scheduler.next_prefetch(), None);
    }
}
