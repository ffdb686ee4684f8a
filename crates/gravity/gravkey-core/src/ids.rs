//! Rider identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dense index of a rider inside a [`crate::timeline::Choreography`]; also
/// its index in the keyframe stream handed to the engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RiderId(pub u32);

impl RiderId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RiderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rider#{}", self.0)
    }
}

/// Monotonic allocator for RiderId.
#[derive(Default, Debug, Clone)]
pub struct IdAllocator {
    next_rider: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_rider(&mut self) -> RiderId {
        let id = RiderId(self.next_rider);
        self.next_rider = self.next_rider.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_dense_ids_and_resets() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.alloc_rider(), RiderId(0));
        assert_eq!(ids.alloc_rider(), RiderId(1));
        ids.reset();
        assert_eq!(ids.alloc_rider().index(), 0);
    }
}
