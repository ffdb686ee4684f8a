//! Contact points of a rider and bitset groups over them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GravityError;

/// Contact points simulated per rider (sled, body and scarf).
pub const POINTS_PER_RIDER: usize = 17;

const NAMES: [&str; POINTS_PER_RIDER] = [
    "PEG", "TAIL", "NOSE", "STRING", "BUTT", "SHOULDER", "RHAND", "LHAND", "LFOOT", "RFOOT",
    "SCARF_0", "SCARF_1", "SCARF_2", "SCARF_3", "SCARF_4", "SCARF_5", "SCARF_6",
];

/// Index of a rider contact point, always `< POINTS_PER_RIDER`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ContactPoint(u8);

impl ContactPoint {
    pub const PEG: ContactPoint = ContactPoint(0);
    pub const TAIL: ContactPoint = ContactPoint(1);
    pub const NOSE: ContactPoint = ContactPoint(2);
    pub const STRING: ContactPoint = ContactPoint(3);
    pub const BUTT: ContactPoint = ContactPoint(4);
    pub const SHOULDER: ContactPoint = ContactPoint(5);
    pub const RHAND: ContactPoint = ContactPoint(6);
    pub const LHAND: ContactPoint = ContactPoint(7);
    pub const LFOOT: ContactPoint = ContactPoint(8);
    pub const RFOOT: ContactPoint = ContactPoint(9);
    pub const SCARF_0: ContactPoint = ContactPoint(10);
    pub const SCARF_1: ContactPoint = ContactPoint(11);
    pub const SCARF_2: ContactPoint = ContactPoint(12);
    pub const SCARF_3: ContactPoint = ContactPoint(13);
    pub const SCARF_4: ContactPoint = ContactPoint(14);
    pub const SCARF_5: ContactPoint = ContactPoint(15);
    pub const SCARF_6: ContactPoint = ContactPoint(16);

    #[inline]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < POINTS_PER_RIDER {
            Some(ContactPoint(index))
        } else {
            None
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        NAMES[self.index()]
    }

    /// Case-insensitive lookup by name (`"peg"`, `"SCARF_3"`).
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| ContactPoint(i as u8))
    }

    pub fn all() -> impl Iterator<Item = ContactPoint> {
        (0..POINTS_PER_RIDER as u8).map(ContactPoint)
    }

    #[inline]
    pub fn is_scarf(self) -> bool {
        PointSet::SCARF.contains(self)
    }
}

impl TryFrom<u8> for ContactPoint {
    type Error = GravityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ContactPoint::new(value).ok_or(GravityError::InvalidContactPoint(value))
    }
}

impl From<ContactPoint> for u8 {
    fn from(cp: ContactPoint) -> u8 {
        cp.0
    }
}

impl fmt::Debug for ContactPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ContactPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of contact points of one rider. Serialized as a list of indices.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<ContactPoint>", into = "Vec<ContactPoint>")]
pub struct PointSet(u32);

impl PointSet {
    pub const EMPTY: PointSet = PointSet(0);
    pub const ALL: PointSet = PointSet((1 << POINTS_PER_RIDER) - 1);
    /// PEG, TAIL, NOSE, STRING.
    pub const SLED: PointSet = PointSet(0b0000_0000_0000_1111);
    /// BUTT through RFOOT.
    pub const RIDER_BODY: PointSet = PointSet(0b0000_0011_1111_0000);
    pub const SCARF: PointSet = PointSet(0b1_1111_1100_0000_0000);
    /// Points that collide with track lines.
    pub const COLLISION: PointSet = PointSet(0b0000_0011_1111_1111);
    pub const NOT_SCARF: PointSet = PointSet::COLLISION;

    pub fn single(cp: ContactPoint) -> Self {
        PointSet(1 << cp.0)
    }

    #[inline]
    pub fn contains(self, cp: ContactPoint) -> bool {
        self.0 & (1 << cp.0) != 0
    }

    pub fn insert(&mut self, cp: ContactPoint) {
        self.0 |= 1 << cp.0;
    }

    pub fn remove(&mut self, cp: ContactPoint) {
        self.0 &= !(1 << cp.0);
    }

    pub fn union(self, other: PointSet) -> PointSet {
        PointSet(self.0 | other.0)
    }

    pub fn intersection(self, other: PointSet) -> PointSet {
        PointSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Lowest contact point in the set.
    pub fn first(self) -> Option<ContactPoint> {
        if self.0 == 0 {
            None
        } else {
            Some(ContactPoint(self.0.trailing_zeros() as u8))
        }
    }

    /// Ascending iteration.
    pub fn iter(self) -> impl Iterator<Item = ContactPoint> {
        ContactPoint::all().filter(move |cp| self.contains(*cp))
    }

    /// Named groups used by scripts.
    pub fn from_group(name: &str) -> Option<PointSet> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Some(PointSet::ALL),
            "sled" => Some(PointSet::SLED),
            "rider" | "body" | "rider_body" => Some(PointSet::RIDER_BODY),
            "scarf" => Some(PointSet::SCARF),
            "collision" | "not_scarf" => Some(PointSet::COLLISION),
            other => ContactPoint::from_name(other).map(PointSet::single),
        }
    }
}

impl Default for PointSet {
    fn default() -> Self {
        PointSet::ALL
    }
}

impl FromIterator<ContactPoint> for PointSet {
    fn from_iter<I: IntoIterator<Item = ContactPoint>>(iter: I) -> Self {
        let mut set = PointSet::EMPTY;
        for cp in iter {
            set.insert(cp);
        }
        set
    }
}

impl From<Vec<ContactPoint>> for PointSet {
    fn from(points: Vec<ContactPoint>) -> Self {
        points.into_iter().collect()
    }
}

impl From<PointSet> for Vec<ContactPoint> {
    fn from(set: PointSet) -> Self {
        set.iter().collect()
    }
}

impl From<ContactPoint> for PointSet {
    fn from(cp: ContactPoint) -> Self {
        PointSet::single(cp)
    }
}

impl fmt::Debug for PointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_partition_all_points() {
        assert_eq!(PointSet::SLED.len(), 4);
        assert_eq!(PointSet::RIDER_BODY.len(), 6);
        assert_eq!(PointSet::SCARF.len(), 7);
        let union = PointSet::SLED.union(PointSet::RIDER_BODY).union(PointSet::SCARF);
        assert_eq!(union, PointSet::ALL);
        assert!(PointSet::SLED.intersection(PointSet::RIDER_BODY).is_empty());
        assert_eq!(PointSet::COLLISION, PointSet::SLED.union(PointSet::RIDER_BODY));
    }

    #[test]
    fn group_members_by_name() {
        assert!(PointSet::SLED.contains(ContactPoint::STRING));
        assert!(!PointSet::SLED.contains(ContactPoint::BUTT));
        assert!(PointSet::RIDER_BODY.contains(ContactPoint::RFOOT));
        assert!(ContactPoint::SCARF_0.is_scarf());
        assert_eq!(PointSet::SCARF.first(), Some(ContactPoint::SCARF_0));
    }

    #[test]
    fn rejects_out_of_range_indices() {
        assert!(ContactPoint::new(16).is_some());
        assert!(ContactPoint::new(17).is_none());
        assert!(matches!(
            ContactPoint::try_from(17u8),
            Err(GravityError::InvalidContactPoint(17))
        ));
        assert!(serde_json::from_str::<PointSet>("[0, 17]").is_err());
    }

    #[test]
    fn serializes_as_index_list() {
        let set: PointSet = [ContactPoint::LHAND, ContactPoint::RHAND].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[6,7]");
        let back: PointSet = serde_json::from_str("[7, 6]").unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn names_round_trip() {
        for cp in ContactPoint::all() {
            assert_eq!(ContactPoint::from_name(cp.name()), Some(cp));
        }
        assert_eq!(PointSet::from_group("lhand"), Some(PointSet::single(ContactPoint::LHAND)));
        assert_eq!(PointSet::from_group("wings"), None);
    }
}
