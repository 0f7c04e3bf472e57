//! Alternative sets and conflict information

use smallvec::SmallVec;
use std::fmt;

const WORD_BITS: u32 = u64::BITS;

/// A set of alternative numbers stored as a bit set
///
/// Words are only ever appended, so two sets holding the same alternatives
/// always hold the same words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AltSet {
    words: SmallVec<[u64; 2]>,
}

impl AltSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an alternative, returning whether it was newly added
    pub fn insert(&mut self, alt: u32) -> bool {
        let (word, bit) = Self::locate(alt);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_set = self.words[word] & bit != 0;
        self.words[word] |= bit;
        !was_set
    }

    #[must_use]
    pub fn contains(&self, alt: u32) -> bool {
        let (word, bit) = Self::locate(alt);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// Number of alternatives in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Smallest alternative in the set
    #[must_use]
    pub fn min(&self) -> Option<u32> {
        self.iter().next()
    }

    /// Alternatives in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let base = index as u32 * WORD_BITS;
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| base + bit)
        })
    }

    fn locate(alt: u32) -> (usize, u64) {
        ((alt / WORD_BITS) as usize, 1u64 << (alt % WORD_BITS))
    }
}

impl FromIterator<u32> for AltSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<u32> for AltSet {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for alt in iter {
            self.insert(alt);
        }
    }
}

impl fmt::Display for AltSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, alt) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{alt}")?;
        }
        f.write_str("}")
    }
}

/// Alternatives found to conflict by the prediction engine
///
/// An exact conflict means every configuration in the set takes part in
/// the conflict; otherwise only a subset does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ConflictInfo {
    conflicted_alts: AltSet,
    exact: bool,
}

impl ConflictInfo {
    #[must_use]
    pub const fn new(conflicted_alts: AltSet, exact: bool) -> Self {
        Self {
            conflicted_alts,
            exact,
        }
    }

    #[must_use]
    pub const fn conflicted_alts(&self) -> &AltSet {
        &self.conflicted_alts
    }

    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.exact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut alts = AltSet::new();
        assert!(alts.is_empty());
        assert!(alts.insert(1));
        assert!(!alts.insert(1));
        assert!(alts.insert(130));
        assert!(alts.contains(1));
        assert!(alts.contains(130));
        assert!(!alts.contains(2));
        assert_eq!(alts.len(), 2);
        assert_eq!(alts.min(), Some(1));
    }

    #[test]
    fn test_iteration_is_ascending() {
        let alts: AltSet = [70, 3, 1, 64].into_iter().collect();
        assert_eq!(alts.iter().collect::<Vec<_>>(), vec![1, 3, 64, 70]);
        assert_eq!(alts.to_string(), "{1, 3, 64, 70}");
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let a: AltSet = [1, 2, 99].into_iter().collect();
        let b: AltSet = [99, 2, 1].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_conflict_info() {
        let info = ConflictInfo::new([1, 2].into_iter().collect(), true);
        assert!(info.is_exact());
        assert_eq!(info.conflicted_alts().len(), 2);
    }
}
