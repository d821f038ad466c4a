//! Range calculation for fixed-extent lists.
//!
//! This module implements the virtualization arithmetic that determines which
//! item indices must be materialized for the current scroll position and
//! viewport size. The work is constant-time in the number of items; only the
//! window itself is allocated.

use std::ops::Range;

use smallvec::SmallVec;

use super::viewport::ViewportState;
use crate::error::InvalidViewport;

/// Inline capacity of a [`RenderWindow`]. Typical viewports plus overscan fit
/// without touching the heap.
const INLINE_SLOTS: usize = 32;

/// A single materialized position in a [`RenderWindow`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowSlot {
    /// Position in the current derived view.
    pub index: usize,

    /// Offset from the start of the content.
    pub offset: f64,
}

/// The contiguous run of indices that must currently be rendered.
///
/// Slots are strictly increasing by index. The window covers the visible
/// range plus overscan padding on either side.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderWindow {
    slots: SmallVec<[WindowSlot; INLINE_SLOTS]>,
    visible: Range<usize>,
    item_count: usize,
    item_extent: f32,
}

impl RenderWindow {
    /// A window over an empty collection.
    pub fn empty(item_extent: f32) -> Self {
        Self {
            slots: SmallVec::new(),
            visible: 0..0,
            item_count: 0,
            item_extent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[WindowSlot] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = &WindowSlot> + '_ {
        self.slots.iter()
    }

    /// Indices in the window, overscan included.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().map(|slot| slot.index)
    }

    /// Half-open range of indices covered by the window, overscan included.
    pub fn range(&self) -> Range<usize> {
        match (self.slots.first(), self.slots.last()) {
            (Some(first), Some(last)) => first.index..last.index + 1,
            _ => 0..0,
        }
    }

    /// Half-open range of indices intersecting the viewport, without overscan.
    pub fn visible_range(&self) -> Range<usize> {
        self.visible.clone()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }

    /// Whether `index` is in the window only because of overscan.
    pub fn is_overscan(&self, index: usize) -> bool {
        self.contains(index) && !self.visible.contains(&index)
    }

    /// Number of items the window was computed for.
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Extent of the whole content, used to size scrollbars.
    pub fn total_content_extent(&self) -> f64 {
        self.item_count as f64 * f64::from(self.item_extent)
    }
}

impl<'a> IntoIterator for &'a RenderWindow {
    type Item = &'a WindowSlot;
    type IntoIter = std::slice::Iter<'a, WindowSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// Computes the render window for `item_count` fixed-extent items.
///
/// 1. First visible index is `floor(scroll_offset / item_extent)`
/// 2. Last visible index is `ceil((scroll_offset + viewport_extent) / item_extent) - 1`
/// 3. Both are clamped to `[0, item_count - 1]`
/// 4. Both ends are widened by `overscan_count` and clamped again
///
/// An empty collection yields an empty window. Scrolling past the end of the
/// content clamps to the last item rather than producing an empty window.
/// A zero `viewport_extent` has an empty visible range; only overscan around
/// the scroll position is materialized.
///
/// # Errors
/// Returns [`InvalidViewport`] when the geometry fails
/// [`ViewportState::validate`].
pub fn compute_range(
    viewport: &ViewportState,
    item_count: usize,
) -> Result<RenderWindow, InvalidViewport> {
    viewport.validate()?;

    if item_count == 0 {
        return Ok(RenderWindow::empty(viewport.item_extent));
    }

    let extent = f64::from(viewport.item_extent);

    // Float-to-int casts saturate, so huge offsets land on the last item.
    let first_visible = ((viewport.scroll_offset / extent).floor() as usize).min(item_count - 1);

    let visible_end = if viewport.viewport_extent > 0.0 {
        let bottom = viewport.scroll_offset + f64::from(viewport.viewport_extent);
        ((bottom / extent).ceil() as usize)
            .min(item_count)
            .max(first_visible + 1)
    } else {
        first_visible
    };

    let start = first_visible.saturating_sub(viewport.overscan_count);
    let stop = visible_end
        .saturating_add(viewport.overscan_count)
        .min(item_count);

    let mut slots = SmallVec::with_capacity(stop - start);
    slots.extend((start..stop).map(|index| WindowSlot {
        index,
        offset: viewport.offset_of(index),
    }));

    Ok(RenderWindow {
        slots,
        visible: first_visible..visible_end,
        item_count,
        item_extent: viewport.item_extent,
    })
}
