//! Viewport geometry for fixed-extent lists.
//!
//! Provides [`ViewportState`], the scroll position and extents that drive the
//! range calculator. The state is a plain value owned by the render
//! coordinator; scroll and resize events mutate it in place.
//!
//! Extents are `f32`. Positions in content space (the scroll offset and item
//! offsets) are `f64` so that lists with millions of items still resolve
//! sub-pixel scroll deltas.

use crate::error::{InvalidViewport, ViewportField};

/// Default item extent used when none is configured.
/// 48.0 is a common list row height.
pub const DEFAULT_ITEM_EXTENT: f32 = 48.0;

/// Default number of items kept materialized beyond each visible edge.
pub const DEFAULT_OVERSCAN_COUNT: usize = 2;

/// Direction of the most recent scroll movement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Towards higher indices.
    #[default]
    Forward,
    /// Towards lower indices.
    Backward,
}

impl ScrollDirection {
    /// Direction implied by a scroll delta, or `None` for a zero delta.
    pub fn from_delta(delta: f64) -> Option<Self> {
        if delta > 0.0 {
            Some(ScrollDirection::Forward)
        } else if delta < 0.0 {
            Some(ScrollDirection::Backward)
        } else {
            None
        }
    }
}

/// Scroll position and extents of a single-axis list viewport.
///
/// All extents are in the same unit (pixels, terminal rows, ...).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    /// Distance from the start of the content to the top of the viewport.
    pub scroll_offset: f64,

    /// Size of the visible area along the scroll axis.
    pub viewport_extent: f32,

    /// Size of every item along the scroll axis.
    pub item_extent: f32,

    /// Extra items materialized before and after the visible area.
    pub overscan_count: usize,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scroll_offset: 0.0,
            viewport_extent: 0.0,
            item_extent: DEFAULT_ITEM_EXTENT,
            overscan_count: DEFAULT_OVERSCAN_COUNT,
        }
    }
}

impl ViewportState {
    /// Creates a viewport scrolled to the top.
    pub fn new(viewport_extent: f32, item_extent: f32) -> Self {
        Self {
            viewport_extent,
            item_extent,
            ..Self::default()
        }
    }

    pub fn with_scroll_offset(mut self, scroll_offset: f64) -> Self {
        self.scroll_offset = scroll_offset;
        self
    }

    pub fn with_overscan(mut self, overscan_count: usize) -> Self {
        self.overscan_count = overscan_count;
        self
    }

    /// Checks the geometry invariants.
    ///
    /// `item_extent` must be positive, `viewport_extent` and `scroll_offset`
    /// non-negative, and every field finite.
    pub fn validate(&self) -> Result<(), InvalidViewport> {
        if !(self.item_extent.is_finite() && self.item_extent > 0.0) {
            return Err(InvalidViewport {
                field: ViewportField::ItemExtent,
                value: f64::from(self.item_extent),
                expected: "a positive finite number",
            });
        }
        if !(self.viewport_extent.is_finite() && self.viewport_extent >= 0.0) {
            return Err(InvalidViewport {
                field: ViewportField::ViewportExtent,
                value: f64::from(self.viewport_extent),
                expected: "a non-negative finite number",
            });
        }
        if !(self.scroll_offset.is_finite() && self.scroll_offset >= 0.0) {
            return Err(InvalidViewport {
                field: ViewportField::ScrollOffset,
                value: self.scroll_offset,
                expected: "a non-negative finite number",
            });
        }
        Ok(())
    }

    /// Total extent of `item_count` items laid end to end.
    pub fn content_extent(&self, item_count: usize) -> f64 {
        self.offset_of(item_count)
    }

    /// Largest scroll offset that still keeps the viewport filled.
    pub fn max_scroll_offset(&self, item_count: usize) -> f64 {
        (self.content_extent(item_count) - f64::from(self.viewport_extent)).max(0.0)
    }

    /// Offset of the item at `index` from the start of the content.
    pub fn offset_of(&self, index: usize) -> f64 {
        index as f64 * f64::from(self.item_extent)
    }

    /// Moves the scroll position by `delta`, clamped to
    /// `[0, max_scroll_offset]`.
    ///
    /// Returns the amount of scroll actually consumed.
    pub fn scroll_by(&mut self, delta: f32, item_count: usize) -> f32 {
        if !delta.is_finite() {
            return 0.0;
        }
        let current = self.scroll_offset;
        let target = (current + f64::from(delta)).clamp(0.0, self.max_scroll_offset(item_count));
        self.scroll_offset = target;
        (target - current) as f32
    }

    /// Jumps to an absolute offset, clamped to `[0, max_scroll_offset]`.
    pub fn scroll_to(&mut self, offset: f64, item_count: usize) {
        if offset.is_finite() {
            self.scroll_offset = offset.clamp(0.0, self.max_scroll_offset(item_count));
        }
    }

    /// Scrolls so that the item at `index` is aligned with the top edge, or
    /// as close to it as the content allows.
    pub fn scroll_to_item(&mut self, index: usize, item_count: usize) {
        let target = self.offset_of(index);
        self.scroll_to(target, item_count);
    }
}
