//! Physical address ranges.
//!
//! An `AddrRange` is a half-open `[start, end)` interval claimed by the system,
//! the memory controller, or an interrupt controller window. Containment, overlap
//! and subset checks are used at freeze time and by the crossbar address maps.

use std::fmt;

use super::error::TopologyError;

/// A contiguous, non-empty physical address interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddrRange {
    start: u64,
    end: u64,
}

impl AddrRange {
    /// Creates the range `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EmptyAddressRange`] when `start >= end`.
    pub fn new(start: u64, end: u64) -> Result<Self, TopologyError> {
        if start >= end {
            return Err(TopologyError::EmptyAddressRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates the range `[start, start + size)`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EmptyAddressRange`] when `size` is zero or the
    /// end of the range does not fit in 64 bits.
    pub fn with_size(start: u64, size: u64) -> Result<Self, TopologyError> {
        match start.checked_add(size) {
            Some(end) => Self::new(start, end),
            None => Err(TopologyError::EmptyAddressRange {
                start,
                end: u64::MAX,
            }),
        }
    }

    /// Creates the range `[0, size)`, the shape of a plain memory declaration such as `"512MB"`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EmptyAddressRange`] when `size` is zero.
    pub fn from_size(size: u64) -> Result<Self, TopologyError> {
        Self::with_size(0, size)
    }

    /// First address inside the range.
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// First address past the range.
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered.
    pub const fn size(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` if `addr` lies inside the range.
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Returns `true` if the two ranges share at least one address.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns `true` if every address of `self` is also inside `other`.
    pub const fn is_subset_of(&self, other: &Self) -> bool {
        self.start >= other.start && self.end <= other.end
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}:{:#x})", self.start, self.end)
    }
}
