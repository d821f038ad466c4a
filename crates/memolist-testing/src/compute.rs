use std::cell::RefCell;
use std::rc::Rc;

use memolist_foundation::ComputeError;

#[derive(Debug, Default)]
struct Counts {
    total: usize,
    per_item: Vec<String>,
}

/// Wraps a compute function and counts how often it runs.
///
/// Clones share the same counters, so a clone can be moved into the
/// coordinator while the test keeps another to inspect.
pub struct CountingCompute<T, V> {
    compute: Rc<dyn Fn(&T) -> Result<V, ComputeError>>,
    label: Rc<dyn Fn(&T) -> String>,
    counts: Rc<RefCell<Counts>>,
}

impl<T, V> Clone for CountingCompute<T, V> {
    fn clone(&self) -> Self {
        Self {
            compute: Rc::clone(&self.compute),
            label: Rc::clone(&self.label),
            counts: Rc::clone(&self.counts),
        }
    }
}

impl<T: 'static, V: 'static> CountingCompute<T, V> {
    /// `label` names each item in [`calls_for`](Self::calls_for).
    pub fn new(
        compute: impl Fn(&T) -> Result<V, ComputeError> + 'static,
        label: impl Fn(&T) -> String + 'static,
    ) -> Self {
        Self {
            compute: Rc::new(compute),
            label: Rc::new(label),
            counts: Rc::default(),
        }
    }

    /// Compute closure suitable for `RenderCoordinator::new`.
    pub fn function(&self) -> impl Fn(&T) -> Result<V, ComputeError> + 'static {
        let this = self.clone();
        move |item: &T| this.call(item)
    }

    pub fn call(&self, item: &T) -> Result<V, ComputeError> {
        {
            let mut counts = self.counts.borrow_mut();
            counts.total += 1;
            counts.per_item.push((self.label)(item));
        }
        (self.compute)(item)
    }

    /// Total number of invocations.
    pub fn calls(&self) -> usize {
        self.counts.borrow().total
    }

    /// Number of invocations for the item labelled `label`.
    pub fn calls_for(&self, label: &str) -> usize {
        self.counts
            .borrow()
            .per_item
            .iter()
            .filter(|seen| seen.as_str() == label)
            .count()
    }

    /// Labels of computed items in call order.
    pub fn history(&self) -> Vec<String> {
        self.counts.borrow().per_item.clone()
    }

    pub fn reset(&self) {
        let mut counts = self.counts.borrow_mut();
        counts.total = 0;
        counts.per_item.clear();
    }
}
