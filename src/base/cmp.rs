//! The canonical sort order of DNS data.
//!
//! DNSSEC defines its own sort order for names and record data which
//! differs from the ‘normal’ order in a few places. To avoid accidentally
//! mixing the two, the canonical order lives in its own trait,
//! [`CanonicalOrd`], which all types that end up inside signed data
//! implement.
//!
//! Canonical order is defined in [RFC 4034] and clarified in [RFC 6840].
//! For domain names, labels are compared right to left, each pair as octet
//! sequences with ASCII letters lowercased first. Record data is compared
//! as the canonical wire representation.
//!
//! [RFC 4034]: https://tools.ietf.org/html/rfc4034
//! [RFC 6840]: https://tools.ietf.org/html/rfc6840

use core::cmp::Ordering;

/// A trait for the canonical sort order of values.
///
/// Only this trait should be used for ordering wherever DNSSEC signatures
/// or denial chains are involved.
pub trait CanonicalOrd<Rhs: ?Sized = Self> {
    /// Returns the canonical ordering between `self` and `other`.
    #[must_use]
    fn canonical_cmp(&self, other: &Rhs) -> Ordering;

    /// Returns whether `self` is canonically less than `other`.
    #[inline]
    #[must_use]
    fn canonical_lt(&self, other: &Rhs) -> bool {
        matches!(self.canonical_cmp(other), Ordering::Less)
    }

    /// Returns whether `self` is canonically greater than `other`.
    #[inline]
    #[must_use]
    fn canonical_gt(&self, other: &Rhs) -> bool {
        matches!(self.canonical_cmp(other), Ordering::Greater)
    }
}
