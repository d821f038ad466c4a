//! Error taxonomy for windowed rendering.
//!
//! Geometry errors ([`InvalidViewport`]) and programming errors
//! ([`OutOfRangeIndex`]) abort the current render pass. Per-item failures
//! ([`ComputationFailed`]) are isolated to a single cell and retried on the
//! next lookup.

use std::fmt;
use std::fmt::Debug;

use thiserror::Error;

/// Viewport field that failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportField {
    ScrollOffset,
    ViewportExtent,
    ItemExtent,
}

impl fmt::Display for ViewportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewportField::ScrollOffset => "scroll offset",
            ViewportField::ViewportExtent => "viewport extent",
            ViewportField::ItemExtent => "item extent",
        })
    }
}

/// Malformed viewport geometry. Never retried.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("invalid viewport: {field} is {value}, expected {expected}")]
pub struct InvalidViewport {
    pub field: ViewportField,
    pub value: f64,
    pub expected: &'static str,
}

/// An index outside the current derived view was resolved.
///
/// Indices are never clamped on resolution, so this always points at a bug
/// in the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("index {index} is out of range for a derived view of {item_count} items")]
pub struct OutOfRangeIndex {
    pub index: usize,
    pub item_count: usize,
}

/// Failure reported by a per-item compute function.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ComputeError {
    message: String,
}

impl ComputeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ComputeError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ComputeError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A derived value could not be computed for `key`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("computation failed for item {key:?}: {cause}")]
pub struct ComputationFailed<K: Debug> {
    pub key: K,
    #[source]
    pub cause: ComputeError,
}

/// Errors that abort a render pass.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RenderError {
    #[error(transparent)]
    InvalidViewport(#[from] InvalidViewport),
    #[error(transparent)]
    OutOfRangeIndex(#[from] OutOfRangeIndex),
}

/// Errors raised by the item store.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError<K: Debug> {
    #[error("item identity {0:?} appears more than once in the collection")]
    DuplicateKey(K),
    #[error("no item with identity {0:?} in the collection")]
    UnknownKey(K),
    #[error("update changed the identity of item {0:?}")]
    IdentityChanged(K),
}

/// Errors raised while talking to an offload worker.
#[derive(Debug, Error)]
pub enum OffloadError {
    #[error("offload worker is no longer running")]
    Disconnected,
    #[error("failed to spawn offload worker")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_viewport_message() {
        let err = InvalidViewport {
            field: ViewportField::ItemExtent,
            value: 0.0,
            expected: "a positive finite number",
        };
        assert_eq!(
            err.to_string(),
            "invalid viewport: item extent is 0, expected a positive finite number"
        );
    }

    #[test]
    fn test_computation_failed_exposes_cause() {
        use std::error::Error as _;

        let err = ComputationFailed {
            key: 7u64,
            cause: ComputeError::new("division by zero"),
        };
        assert_eq!(
            err.to_string(),
            "computation failed for item 7: division by zero"
        );
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("division by zero".to_string())
        );
    }

    #[test]
    fn test_render_error_is_transparent() {
        let err: RenderError = OutOfRangeIndex {
            index: 12,
            item_count: 10,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "index 12 is out of range for a derived view of 10 items"
        );
    }
}
