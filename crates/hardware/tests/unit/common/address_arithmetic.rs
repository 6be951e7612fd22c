//! # Address Range Tests
//!
//! This module contains unit tests for `AddrRange`: construction, the half-open
//! interval semantics, overlap and subset checks used by the freeze-time
//! validation, and the display format used in diagnostics.

use mcsim_core::common::{AddrRange, TopologyError};
use proptest::prelude::*;

// ══════════════════════════════════════════════════════════
// 1. Construction
// ══════════════════════════════════════════════════════════

#[test]
fn from_size_starts_at_zero() {
    let r = AddrRange::from_size(512 << 20).unwrap();
    assert_eq!(r.start(), 0);
    assert_eq!(r.end(), 512 << 20);
    assert_eq!(r.size(), 512 << 20);
}

#[test]
fn empty_range_is_rejected() {
    assert_eq!(
        AddrRange::new(0x1000, 0x1000),
        Err(TopologyError::EmptyAddressRange {
            start: 0x1000,
            end: 0x1000
        })
    );
    assert!(AddrRange::from_size(0).is_err());
}

#[test]
fn inverted_range_is_rejected() {
    assert!(AddrRange::new(0x2000, 0x1000).is_err());
}

#[test]
fn with_size_overflow_is_rejected() {
    assert!(AddrRange::with_size(u64::MAX - 1, 4).is_err());
}

// ══════════════════════════════════════════════════════════
// 2. Membership
// ══════════════════════════════════════════════════════════

#[test]
fn contains_is_half_open() {
    let r = AddrRange::new(0x1000, 0x2000).unwrap();
    assert!(r.contains(0x1000));
    assert!(r.contains(0x1FFF));
    assert!(!r.contains(0x2000));
    assert!(!r.contains(0x0FFF));
}

#[test]
fn adjacent_ranges_do_not_overlap() {
    let a = AddrRange::new(0x0, 0x1000).unwrap();
    let b = AddrRange::new(0x1000, 0x2000).unwrap();
    assert!(!a.overlaps(&b));
    assert!(!b.overlaps(&a));
}

#[test]
fn subset_includes_equal_range() {
    let outer = AddrRange::from_size(0x10000).unwrap();
    let inner = AddrRange::new(0x100, 0x200).unwrap();
    assert!(inner.is_subset_of(&outer));
    assert!(outer.is_subset_of(&outer));
    assert!(!outer.is_subset_of(&inner));
}

#[test]
fn display_uses_hex_bounds() {
    let r = AddrRange::new(0x1000, 0x2000).unwrap();
    assert_eq!(r.to_string(), "[0x1000:0x2000)");
}

// ══════════════════════════════════════════════════════════
// 3. Properties
// ══════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn overlap_is_symmetric(a in 0u64..1 << 32, la in 1u64..1 << 20, b in 0u64..1 << 32, lb in 1u64..1 << 20) {
        let ra = AddrRange::with_size(a, la).unwrap();
        let rb = AddrRange::with_size(b, lb).unwrap();
        prop_assert_eq!(ra.overlaps(&rb), rb.overlaps(&ra));
    }

    #[test]
    fn overlap_matches_shared_address(a in 0u64..4096, la in 1u64..256, b in 0u64..4096, lb in 1u64..256) {
        let ra = AddrRange::with_size(a, la).unwrap();
        let rb = AddrRange::with_size(b, lb).unwrap();
        let shared = (a..a + la).any(|addr| rb.contains(addr));
        prop_assert_eq!(ra.overlaps(&rb), shared);
    }
}
