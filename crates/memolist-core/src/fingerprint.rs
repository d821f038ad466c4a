//! Input fingerprints for memoized values.
//!
//! A [`Fingerprint`] summarizes the fields of an item that influence a derived
//! value. Two items with the same identity and the same fingerprint are
//! interchangeable as far as the derived value is concerned.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Deterministic 64-bit digest over the cache-relevant fields of an item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint of an item with no relevant inputs.
    pub const EMPTY: Fingerprint = Fingerprint(0);

    /// Wraps a precomputed digest.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Hashes a single value.
    pub fn of<H: Hash + ?Sized>(value: &H) -> Self {
        Self::builder().field(value).finish()
    }

    /// Starts a multi-field fingerprint.
    pub fn builder() -> FingerprintBuilder {
        FingerprintBuilder::default()
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:016x})", self.0)
    }
}

/// Accumulates fields into a [`Fingerprint`].
///
/// Field order matters: `a, b` and `b, a` produce different fingerprints.
/// Floats are hashed by bit pattern after folding `-0.0` into `0.0` and every
/// NaN into a single canonical NaN, which keeps the function total.
///
/// ```
/// use memolist_core::Fingerprint;
///
/// let a = Fingerprint::builder().field(&42u32).f64(9.5).finish();
/// let b = Fingerprint::builder().field(&42u32).f64(9.5).finish();
/// assert_eq!(a, b);
/// ```
#[derive(Default)]
pub struct FingerprintBuilder {
    hasher: FxHasher,
}

impl FingerprintBuilder {
    pub fn field<H: Hash + ?Sized>(mut self, value: &H) -> Self {
        value.hash(&mut self.hasher);
        self
    }

    pub fn f64(mut self, value: f64) -> Self {
        canonical_f64_bits(value).hash(&mut self.hasher);
        self
    }

    pub fn f32(self, value: f32) -> Self {
        self.f64(f64::from(value))
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint(self.hasher.finish())
    }
}

fn canonical_f64_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_fields_same_fingerprint() {
        let a = Fingerprint::builder().field(&120u32).field(&7u32).finish();
        let b = Fingerprint::builder().field(&120u32).field(&7u32).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn test_field_change_changes_fingerprint() {
        let a = Fingerprint::builder().field(&120u32).field(&7u32).finish();
        let b = Fingerprint::builder().field(&120u32).field(&8u32).finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_field_order_matters() {
        let a = Fingerprint::builder().field(&1u32).field(&2u32).finish();
        let b = Fingerprint::builder().field(&2u32).field(&1u32).finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_float_canonicalization() {
        let pos = Fingerprint::builder().f64(0.0).finish();
        let neg = Fingerprint::builder().f64(-0.0).finish();
        assert_eq!(pos, neg);

        let nan_a = Fingerprint::builder().f64(f64::NAN).finish();
        let nan_b = Fingerprint::builder().f64(-f64::NAN).finish();
        assert_eq!(nan_a, nan_b);
    }

    #[test]
    fn test_of_matches_single_field_builder() {
        assert_eq!(
            Fingerprint::of("Electronics"),
            Fingerprint::builder().field("Electronics").finish()
        );
    }
}
