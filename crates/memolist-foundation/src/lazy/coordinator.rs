//! Render coordinator for windowed lists with memoized per-item values.
//!
//! [`RenderCoordinator`] owns the item store, the derived-value cache and the
//! viewport. Every render pass computes the window over the current derived
//! view, resolves each index to an identity, fetches the derived value from
//! the cache (computing or dispatching on a miss) and hands one cell per
//! window slot to a [`CellRenderer`].
//!
//! Changes to the viewport, the collection, the filter, the sort or the cache
//! capacity only mark the coordinator dirty. Several changes between two
//! passes collapse into a single pass, so only the newest geometry is ever
//! surfaced.

use std::fmt::Debug;
use std::time::Duration;

use memolist_core::collections::map::HashMap;
use memolist_core::{Fingerprint, ItemDescriptor};
use web_time::Instant;

use super::item_store::{DerivedView, ItemStore};
use super::memo_cache::{CacheStats, DerivedValueCache, DEFAULT_CACHE_CAPACITY};
use super::offload::{Completion, OffloadBackend};
use super::prefetch::{PrefetchScheduler, PrefetchStrategy};
use super::range::{compute_range, RenderWindow};
use super::viewport::{ScrollDirection, ViewportState, DEFAULT_ITEM_EXTENT, DEFAULT_OVERSCAN_COUNT};
use crate::error::{
    ComputationFailed, ComputeError, InvalidViewport, OutOfRangeIndex, RenderError, StoreError,
};

/// Default visible extent: ten rows of [`DEFAULT_ITEM_EXTENT`].
pub const DEFAULT_VIEWPORT_EXTENT: f32 = 480.0;

/// Turns a derived value into a renderable element.
///
/// Implementations should be pure: the same arguments produce the same
/// element.
pub trait CellRenderer<K: Debug, V> {
    type Element;

    fn render(&mut self, index: usize, key: &K, value: &V, offset: f64) -> Self::Element;

    /// Placeholder for a cell whose value could not be computed.
    fn render_failed(
        &mut self,
        index: usize,
        key: &K,
        error: &ComputationFailed<K>,
        offset: f64,
    ) -> Self::Element;

    /// Placeholder for a cell whose value is still being computed off-thread.
    /// `progress` is the last reported percentage, if any.
    fn render_pending(
        &mut self,
        index: usize,
        key: &K,
        progress: Option<f32>,
        offset: f64,
    ) -> Self::Element;
}

/// Configuration for a [`RenderCoordinator`].
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinatorConfig {
    /// Maximum number of derived values kept alive.
    /// Default is 256.
    pub cache_capacity: usize,

    /// Items kept rendered beyond each visible edge.
    /// Default is 2.
    pub overscan_count: usize,

    /// Extent of every item along the scroll axis.
    pub item_extent: f32,

    /// Initial extent of the visible area.
    pub viewport_extent: f32,

    pub prefetch: PrefetchStrategy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            overscan_count: DEFAULT_OVERSCAN_COUNT,
            item_extent: DEFAULT_ITEM_EXTENT,
            viewport_extent: DEFAULT_VIEWPORT_EXTENT,
            prefetch: PrefetchStrategy::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_overscan(mut self, overscan_count: usize) -> Self {
        self.overscan_count = overscan_count;
        self
    }

    pub fn with_item_extent(mut self, item_extent: f32) -> Self {
        self.item_extent = item_extent;
        self
    }

    pub fn with_viewport_extent(mut self, viewport_extent: f32) -> Self {
        self.viewport_extent = viewport_extent;
        self
    }

    pub fn with_prefetch(mut self, prefetch: PrefetchStrategy) -> Self {
        self.prefetch = prefetch;
        self
    }
}

/// Lifecycle of the coordinator between passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoordinatorPhase {
    /// Nothing rendered for the current inputs yet.
    #[default]
    Idle,
    /// A pass is running, or offloaded values for the window are in flight.
    Computing,
    /// Every cell of the last pass was rendered from a final result.
    Rendered,
}

/// How a cell was rendered.
#[derive(Clone, Debug, PartialEq)]
pub enum CellState {
    Ready,
    Failed(ComputeError),
    Pending { progress: Option<f32> },
}

/// One rendered window slot.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedCell<K, E> {
    pub index: usize,
    pub key: K,
    pub offset: f64,
    pub state: CellState,
    pub element: E,
}

/// Output of a single render pass.
#[derive(Clone, Debug)]
pub struct RenderPass<K, E> {
    /// Monotonic pass counter.
    pub generation: u64,
    pub window: RenderWindow,
    /// Cells in index order, one per window slot.
    pub cells: Vec<RenderedCell<K, E>>,
    pub rendered: usize,
    pub failed: usize,
    pub pending: usize,
    /// Items warmed beyond the window after the cells were rendered.
    pub prefetched: usize,
    /// Cache activity caused by rendering the cells.
    pub cache: CacheStats,
    pub duration: Duration,
}

impl<K, E> RenderPass<K, E> {
    pub fn elements(&self) -> impl Iterator<Item = &E> + '_ {
        self.cells.iter().map(|cell| &cell.element)
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

type ComputeFn<T, V> = Box<dyn Fn(&T) -> Result<V, ComputeError>>;

/// Drives windowed rendering of an [`ItemStore`] through a
/// [`DerivedValueCache`].
///
/// # Example
///
/// ```
/// use memolist_core::{descriptor, Fingerprint};
/// use memolist_foundation::lazy::{
///     CellRenderer, CoordinatorConfig, RenderCoordinator,
/// };
/// use memolist_foundation::{ComputationFailed, ComputeError};
///
/// struct Labels;
///
/// impl CellRenderer<u32, u64> for Labels {
///     type Element = String;
///
///     fn render(&mut self, index: usize, _: &u32, value: &u64, _: f64) -> String {
///         format!("{index}: {value}")
///     }
///
///     fn render_failed(
///         &mut self,
///         index: usize,
///         _: &u32,
///         _: &ComputationFailed<u32>,
///         _: f64,
///     ) -> String {
///         format!("{index}: error")
///     }
///
///     fn render_pending(&mut self, index: usize, _: &u32, _: Option<f32>, _: f64) -> String {
///         format!("{index}: ...")
///     }
/// }
///
/// let mut coordinator = RenderCoordinator::new(
///     descriptor(|n: &u32| *n, |n: &u32| Fingerprint::of(n)),
///     |n: &u32| Ok::<_, ComputeError>(u64::from(*n) * 10),
///     CoordinatorConfig::default()
///         .with_item_extent(10.0)
///         .with_viewport_extent(30.0)
///         .with_overscan(0),
/// );
/// coordinator.set_collection((0..100).collect()).unwrap();
///
/// let pass = coordinator.render(&mut Labels).unwrap();
/// assert_eq!(pass.elements().collect::<Vec<_>>(), ["0: 0", "1: 10", "2: 20"]);
/// ```
pub struct RenderCoordinator<T, D: ItemDescriptor<T>, V> {
    store: ItemStore<T, D>,
    cache: DerivedValueCache<D::Key, V>,
    viewport: ViewportState,
    compute: ComputeFn<T, V>,
    offload: Option<Box<dyn OffloadBackend<T, D::Key, V>>>,
    offload_failures: HashMap<D::Key, (Fingerprint, ComputeError)>,
    prefetch: PrefetchScheduler,
    prefetch_strategy: PrefetchStrategy,
    direction: ScrollDirection,
    phase: CoordinatorPhase,
    generation: u64,
    dirty: bool,
    last_window: Option<RenderWindow>,
    window_keys: HashMap<D::Key, usize>,
}

impl<T, D, V> RenderCoordinator<T, D, V>
where
    D: ItemDescriptor<T>,
    V: Clone,
{
    /// Creates a coordinator over an empty collection.
    ///
    /// The configured geometry is validated on the first render pass.
    pub fn new<F, E>(descriptor: D, compute: F, config: CoordinatorConfig) -> Self
    where
        F: Fn(&T) -> Result<V, E> + 'static,
        E: Into<ComputeError>,
    {
        Self::with_store(ItemStore::new(descriptor), compute, config)
    }

    /// Creates a coordinator over an already loaded store.
    pub fn with_store<F, E>(store: ItemStore<T, D>, compute: F, config: CoordinatorConfig) -> Self
    where
        F: Fn(&T) -> Result<V, E> + 'static,
        E: Into<ComputeError>,
    {
        let viewport = ViewportState::new(config.viewport_extent, config.item_extent)
            .with_overscan(config.overscan_count);
        Self {
            store,
            cache: DerivedValueCache::new(config.cache_capacity),
            viewport,
            compute: Box::new(move |item: &T| compute(item).map_err(Into::into)),
            offload: None,
            offload_failures: HashMap::default(),
            prefetch: PrefetchScheduler::new(),
            prefetch_strategy: config.prefetch,
            direction: ScrollDirection::Forward,
            phase: CoordinatorPhase::Idle,
            generation: 0,
            dirty: true,
            last_window: None,
            window_keys: HashMap::default(),
        }
    }

    // ── Data ────────────────────────────────────────────────────────────

    pub fn set_collection(&mut self, items: Vec<T>) -> Result<(), StoreError<D::Key>> {
        self.store.set_collection(items)?;
        self.offload_failures.clear();
        self.view_changed();
        Ok(())
    }

    pub fn set_filter(&mut self, predicate: impl Fn(&T) -> bool + 'static) {
        self.store.set_filter(predicate);
        self.view_changed();
    }

    pub fn clear_filter(&mut self) {
        self.store.clear_filter();
        self.view_changed();
    }

    pub fn set_sort(&mut self, comparator: impl Fn(&T, &T) -> std::cmp::Ordering + 'static) {
        self.store.set_sort(comparator);
        self.view_changed();
    }

    pub fn clear_sort(&mut self) {
        self.store.clear_sort();
        self.view_changed();
    }

    pub fn replace_item(&mut self, item: T) -> Result<T, StoreError<D::Key>> {
        let previous = self.store.replace_item(item)?;
        self.view_changed();
        Ok(previous)
    }

    pub fn update_item(
        &mut self,
        key: &D::Key,
        update: impl FnOnce(&mut T),
    ) -> Result<(), StoreError<D::Key>>
    where
        T: Clone,
    {
        self.store.update_item(key, update)?;
        self.view_changed();
        Ok(())
    }

    // ── Viewport ────────────────────────────────────────────────────────

    /// Replaces the whole viewport geometry.
    ///
    /// # Errors
    /// Returns [`InvalidViewport`] and keeps the previous geometry if
    /// `viewport` fails validation.
    pub fn set_viewport(&mut self, viewport: ViewportState) -> Result<(), InvalidViewport> {
        viewport.validate()?;
        if viewport.scroll_offset != self.viewport.scroll_offset {
            self.direction = if viewport.scroll_offset > self.viewport.scroll_offset {
                ScrollDirection::Forward
            } else {
                ScrollDirection::Backward
            };
        }
        self.viewport = viewport;
        self.mark_dirty();
        Ok(())
    }

    /// Scrolls by `delta`, clamped to the content. Returns the consumed delta.
    pub fn scroll_by(&mut self, delta: f32) -> f32 {
        let previous = self.viewport.scroll_offset;
        let consumed = self.viewport.scroll_by(delta, self.store.view().len());
        self.scrolled_from(previous);
        consumed
    }

    pub fn scroll_to(&mut self, offset: f64) {
        let previous = self.viewport.scroll_offset;
        self.viewport.scroll_to(offset, self.store.view().len());
        self.scrolled_from(previous);
    }

    /// Brings the item at view index `index` to the top edge.
    pub fn scroll_to_item(&mut self, index: usize) -> Result<(), OutOfRangeIndex> {
        let item_count = self.store.view().len();
        if index >= item_count {
            return Err(OutOfRangeIndex { index, item_count });
        }
        let target = self.viewport.offset_of(index);
        self.scroll_to(target);
        Ok(())
    }

    /// Changes the visible extent, keeping the scroll offset within bounds.
    pub fn resize(&mut self, viewport_extent: f32) -> Result<(), InvalidViewport> {
        let mut viewport = self.viewport;
        viewport.viewport_extent = viewport_extent;
        viewport.validate()?;
        viewport.scroll_to(viewport.scroll_offset, self.store.view().len());
        self.viewport = viewport;
        self.mark_dirty();
        Ok(())
    }

    /// Changes the item extent, keeping the first visible item in place.
    pub fn set_item_extent(&mut self, item_extent: f32) -> Result<(), InvalidViewport> {
        let mut viewport = self.viewport;
        viewport.item_extent = item_extent;
        viewport.validate()?;
        let offset = if self.viewport.validate().is_ok() {
            let old_extent = f64::from(self.viewport.item_extent);
            let new_extent = f64::from(item_extent);
            let first = (self.viewport.scroll_offset / old_extent).floor();
            let within = self.viewport.scroll_offset - first * old_extent;
            first * new_extent + within.min(new_extent)
        } else {
            0.0
        };
        viewport.scroll_to(offset, self.store.view().len());
        self.viewport = viewport;
        self.mark_dirty();
        Ok(())
    }

    pub fn set_overscan(&mut self, overscan_count: usize) {
        if self.viewport.overscan_count != overscan_count {
            self.viewport.overscan_count = overscan_count;
            self.mark_dirty();
        }
    }

    // ── Cache and offload ───────────────────────────────────────────────

    pub fn set_cache_capacity(&mut self, capacity: usize) {
        self.cache.set_capacity(capacity);
        self.mark_dirty();
    }

    pub fn set_prefetch(&mut self, strategy: PrefetchStrategy) {
        self.prefetch_strategy = strategy;
        self.prefetch.clear();
    }

    /// Routes cache misses to `backend` instead of computing them inline.
    pub fn attach_offload(&mut self, backend: impl OffloadBackend<T, D::Key, V> + 'static) {
        self.offload = Some(Box::new(backend));
        self.mark_dirty();
    }

    /// Returns to inline computation. In-flight results are abandoned.
    pub fn detach_offload(&mut self) -> Option<Box<dyn OffloadBackend<T, D::Key, V>>> {
        let backend = self.offload.take();
        if backend.is_some() {
            self.offload_failures.clear();
            self.mark_dirty();
        }
        backend
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Runs a render pass over the current inputs.
    ///
    /// # Errors
    /// [`RenderError::InvalidViewport`] for malformed geometry and
    /// [`RenderError::OutOfRangeIndex`] if a window index cannot be resolved.
    /// Both abort the pass. Per-item failures do not; they are rendered via
    /// [`CellRenderer::render_failed`].
    pub fn render<R>(
        &mut self,
        renderer: &mut R,
    ) -> Result<RenderPass<D::Key, R::Element>, RenderError>
    where
        R: CellRenderer<D::Key, V>,
    {
        let started = Instant::now();
        let window = match compute_range(&self.viewport, self.store.view().len()) {
            Ok(window) => window,
            Err(err) => {
                self.phase = CoordinatorPhase::Idle;
                return Err(err.into());
            }
        };

        self.phase = CoordinatorPhase::Computing;
        self.generation += 1;

        let mut pass = match self.render_cells(window, renderer) {
            Ok(pass) => pass,
            Err(err) => {
                self.phase = CoordinatorPhase::Idle;
                return Err(err.into());
            }
        };
        pass.prefetched = self.run_prefetch(&pass.window);
        pass.duration = started.elapsed();

        self.dirty = false;
        self.phase = if pass.is_complete() {
            CoordinatorPhase::Rendered
        } else {
            CoordinatorPhase::Computing
        };
        self.last_window = Some(pass.window.clone());

        log::debug!(
            "render pass {}: {} cells over {} items ({} failed, {} pending, {} hits, {} misses) \
             in {:?}",
            pass.generation,
            pass.cells.len(),
            pass.window.item_count(),
            pass.failed,
            pass.pending,
            pass.cache.hits,
            pass.cache.misses,
            pass.duration
        );
        Ok(pass)
    }

    /// Renders only if something changed since the last pass.
    pub fn render_if_dirty<R>(
        &mut self,
        renderer: &mut R,
    ) -> Result<Option<RenderPass<D::Key, R::Element>>, RenderError>
    where
        R: CellRenderer<D::Key, V>,
    {
        if self.dirty {
            self.render(renderer).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Absorbs finished offloaded computations without blocking.
    ///
    /// Every current result is cached. A new pass is rendered only when a
    /// result belongs to an item in the last rendered window.
    pub fn poll_offload<R>(
        &mut self,
        renderer: &mut R,
    ) -> Result<Option<RenderPass<D::Key, R::Element>>, RenderError>
    where
        R: CellRenderer<D::Key, V>,
    {
        let completions = match self.offload.as_mut() {
            Some(backend) => backend.poll(),
            None => return Ok(None),
        };
        self.absorb(completions, renderer)
    }

    /// Like [`poll_offload`](Self::poll_offload), but waits up to `timeout`
    /// for the first result.
    pub fn wait_offload<R>(
        &mut self,
        renderer: &mut R,
        timeout: Duration,
    ) -> Result<Option<RenderPass<D::Key, R::Element>>, RenderError>
    where
        R: CellRenderer<D::Key, V>,
    {
        let completions = match self.offload.as_mut() {
            Some(backend) => backend.poll_timeout(timeout),
            None => return Ok(None),
        };
        self.absorb(completions, renderer)
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn store(&self) -> &ItemStore<T, D> {
        &self.store
    }

    pub fn view(&self) -> &DerivedView<D::Key> {
        self.store.view()
    }

    pub fn cache(&self) -> &DerivedValueCache<D::Key, V> {
        &self.cache
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn phase(&self) -> CoordinatorPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn scroll_direction(&self) -> ScrollDirection {
        self.direction
    }

    /// Window of the last successful pass.
    pub fn last_window(&self) -> Option<&RenderWindow> {
        self.last_window.as_ref()
    }

    pub fn has_offload(&self) -> bool {
        self.offload.is_some()
    }

    /// Number of offloaded computations in flight.
    pub fn pending_len(&self) -> usize {
        self.offload.as_ref().map_or(0, |backend| backend.pending_len())
    }

    fn scrolled_from(&mut self, previous: f64) {
        let delta = self.viewport.scroll_offset - previous;
        if let Some(direction) = ScrollDirection::from_delta(delta) {
            self.direction = direction;
            self.mark_dirty();
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.phase = CoordinatorPhase::Idle;
    }

    fn view_changed(&mut self) {
        // A shorter view may leave the offset past the end of the content.
        let item_count = self.store.view().len();
        self.viewport.scroll_to(self.viewport.scroll_offset, item_count);
        self.mark_dirty();
    }

    fn render_cells<R>(
        &mut self,
        window: RenderWindow,
        renderer: &mut R,
    ) -> Result<RenderPass<D::Key, R::Element>, OutOfRangeIndex>
    where
        R: CellRenderer<D::Key, V>,
    {
        let stats_before = self.cache.stats();
        let mut cells = Vec::with_capacity(window.len());
        let (mut rendered, mut failed, mut pending) = (0, 0, 0);

        self.window_keys.clear();
        for slot in window.iter() {
            let (key, item) = self.store.entry_at(slot.index)?;
            let fingerprint = self.store.descriptor().fingerprint(item);
            self.window_keys.insert(key.clone(), slot.index);

            let outcome = match self.offload.as_mut() {
                None => self
                    .cache
                    .get_with(key, fingerprint, || (self.compute)(item))
                    .map_err(Some),
                Some(backend) => {
                    if let Some(value) = self.cache.lookup(key, fingerprint) {
                        Ok(value)
                    } else if let Some(cause) =
                        take_failure(&mut self.offload_failures, key, fingerprint)
                    {
                        Err(Some(ComputationFailed {
                            key: key.clone(),
                            cause,
                        }))
                    } else {
                        match backend.request(key, fingerprint, item) {
                            Ok(_) => Err(None),
                            Err(err) => Err(Some(ComputationFailed {
                                key: key.clone(),
                                cause: ComputeError::new(err.to_string()),
                            })),
                        }
                    }
                }
            };

            let (state, element) = match outcome {
                Ok(value) => {
                    rendered += 1;
                    log::trace!("rendering cell {} ({:?})", slot.index, key);
                    let element = renderer.render(slot.index, key, &value, slot.offset);
                    (CellState::Ready, element)
                }
                Err(Some(error)) => {
                    failed += 1;
                    let element = renderer.render_failed(slot.index, key, &error, slot.offset);
                    (CellState::Failed(error.cause), element)
                }
                Err(None) => {
                    pending += 1;
                    let progress = self.offload.as_ref().and_then(|backend| backend.progress(key));
                    let element = renderer.render_pending(slot.index, key, progress, slot.offset);
                    (CellState::Pending { progress }, element)
                }
            };

            cells.push(RenderedCell {
                index: slot.index,
                key: key.clone(),
                offset: slot.offset,
                state,
                element,
            });
        }

        Ok(RenderPass {
            generation: self.generation,
            cache: self.cache.stats().since(&stats_before),
            window,
            cells,
            rendered,
            failed,
            pending,
            prefetched: 0,
            duration: Duration::ZERO,
        })
    }

    /// Warms values just past `window` in the scroll direction.
    fn run_prefetch(&mut self, window: &RenderWindow) -> usize {
        if !self.prefetch_strategy.enabled {
            return 0;
        }
        // Prefetching must never evict the cells that were just rendered.
        if self.cache.capacity() < window.len() + self.prefetch_strategy.prefetch_count {
            return 0;
        }

        self.prefetch.update(
            window.range(),
            window.item_count(),
            self.direction,
            &self.prefetch_strategy,
        );

        let mut warmed = 0;
        while let Some(index) = self.prefetch.next_prefetch() {
            let Ok((key, item)) = self.store.entry_at(index) else {
                continue;
            };
            let fingerprint = self.store.descriptor().fingerprint(item);
            if self.cache.contains(key, fingerprint) {
                continue;
            }
            match self.offload.as_mut() {
                Some(backend) => {
                    if backend.request(key, fingerprint, item).is_ok() {
                        warmed += 1;
                    }
                }
                None => match self.cache.get_with(key, fingerprint, || (self.compute)(item)) {
                    Ok(_) => warmed += 1,
                    Err(err) => log::trace!("prefetch skipped: {}", err),
                },
            }
        }
        warmed
    }

    fn absorb<R>(
        &mut self,
        completions: Vec<Completion<D::Key, V>>,
        renderer: &mut R,
    ) -> Result<Option<RenderPass<D::Key, R::Element>>, RenderError>
    where
        R: CellRenderer<D::Key, V>,
    {
        let mut touches_window = false;
        for completion in completions {
            let current = self
                .store
                .get(completion.key())
                .map(|item| self.store.descriptor().fingerprint(item));
            let in_window = self.window_keys.contains_key(completion.key());

            match completion {
                Completion::Ready {
                    key,
                    fingerprint,
                    value,
                    duration_ms,
                } => {
                    let stored = current.is_some_and(|current| {
                        self.cache
                            .insert_computed(key.clone(), fingerprint, current, value)
                    });
                    if !stored {
                        log::warn!("discarding stale offload result for {:?}", key);
                        continue;
                    }
                    log::trace!("offload result for {:?} after {:.1}ms", key, duration_ms);
                    touches_window |= in_window;
                }
                Completion::Failed {
                    key,
                    fingerprint,
                    error,
                } => {
                    if current != Some(fingerprint) {
                        log::warn!("discarding stale offload error for {:?}", key);
                        continue;
                    }
                    if in_window {
                        self.offload_failures.insert(key, (fingerprint, error));
                        touches_window = true;
                    }
                }
            }
        }

        if touches_window {
            self.mark_dirty();
            self.render(renderer).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Removes the failure recorded for `key`, if it is for `fingerprint`.
/// A failure is reported by exactly one pass; the following pass retries.
fn take_failure<K: Eq + std::hash::Hash>(
    failures: &mut HashMap<K, (Fingerprint, ComputeError)>,
    key: &K,
    fingerprint: Fingerprint,
) -> Option<ComputeError> {
    match failures.remove(key) {
        Some((recorded, error)) if recorded == fingerprint => Some(error),
        _ => None,
    }
}

impl<T, D, V> Debug for RenderCoordinator<T, D, V>
where
    D: ItemDescriptor<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCoordinator")
            .field("store", &self.store)
            .field("viewport", &self.viewport)
            .field("cache_len", &self.cache.len())
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("dirty", &self.dirty)
            .field("offload", &self.offload.is_some())
            .finish()
    }
}
