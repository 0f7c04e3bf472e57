//! Single-pass cursor over a writable configuration set

use super::{AtnConfig, AtnConfigSet};
use crate::error::ConfigSetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Nothing produced yet
    Fresh,
    /// The configuration at this position was the last one produced
    Produced(usize),
    /// The configuration last produced, formerly at this position, is gone
    Removed(usize),
}

/// Forward cursor that may remove the configuration it just produced
///
/// ```
/// use sipha_atn::atn::StateId;
/// use sipha_atn::config::{AtnConfig, AtnConfigSet};
/// use sipha_atn::context::PredictionContext;
///
/// let mut set = AtnConfigSet::new();
/// for (state, alt) in [(1, 1), (2, 2), (3, 1)] {
///     let ctx = PredictionContext::empty_full().child(0);
///     set.add_uncached(AtnConfig::new(StateId::new(state), alt, ctx))?;
/// }
///
/// let mut cursor = set.cursor();
/// while let Some(config) = cursor.next_config() {
///     if config.alt() == 2 {
///         cursor.remove()?;
///     }
/// }
/// assert_eq!(set.len(), 2);
/// # Ok::<(), sipha_atn::error::ConfigSetError>(())
/// ```
#[derive(Debug)]
pub struct ConfigCursor<'a> {
    set: &'a mut AtnConfigSet,
    next: usize,
    state: CursorState,
}

impl<'a> ConfigCursor<'a> {
    pub(crate) fn new(set: &'a mut AtnConfigSet) -> Self {
        Self {
            set,
            next: 0,
            state: CursorState::Fresh,
        }
    }

    /// Advance to the next configuration
    pub fn next_config(&mut self) -> Option<&AtnConfig> {
        let index = self.next;
        let config = self.set.get(index)?;
        self.next += 1;
        self.state = CursorState::Produced(index);
        Some(config)
    }

    /// Remove the configuration most recently produced by
    /// [`next_config`](Self::next_config)
    ///
    /// # Errors
    ///
    /// [`ConfigSetError::NoCurrentConfig`] before the first call to
    /// `next_config`, [`ConfigSetError::AlreadyRemoved`] when that
    /// configuration was already removed.
    pub fn remove(&mut self) -> Result<AtnConfig, ConfigSetError> {
        match self.state {
            CursorState::Fresh => Err(ConfigSetError::NoCurrentConfig),
            CursorState::Removed(index) => Err(ConfigSetError::AlreadyRemoved { index }),
            CursorState::Produced(index) => {
                let removed = self.set.remove(index)?;
                self.next = index;
                self.state = CursorState::Removed(index);
                Ok(removed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::StateId;
    use crate::context::PredictionContext;

    fn filled(states: &[u32]) -> AtnConfigSet {
        let mut set = AtnConfigSet::new();
        for &state in states {
            set.add_uncached(AtnConfig::new(
                StateId::new(state),
                1,
                PredictionContext::empty_full().child(0),
            ))
            .unwrap();
        }
        set
    }

    #[test]
    fn test_remove_before_next_fails() {
        let mut set = filled(&[1, 2]);
        let mut cursor = set.cursor();
        assert_eq!(cursor.remove(), Err(ConfigSetError::NoCurrentConfig));
    }

    #[test]
    fn test_double_remove_fails() {
        let mut set = filled(&[1, 2, 3]);
        let mut cursor = set.cursor();
        cursor.next_config();
        cursor.next_config();
        assert_eq!(cursor.remove().unwrap().state(), StateId::new(2));
        assert_eq!(
            cursor.remove(),
            Err(ConfigSetError::AlreadyRemoved { index: 1 })
        );

        // the cursor continues with the element after the removed one
        assert_eq!(cursor.next_config().unwrap().state(), StateId::new(3));
        assert!(cursor.remove().is_ok());
        assert!(cursor.next_config().is_none());
        assert_eq!(set.len(), 1);
        set.check_partitions();
    }

    #[test]
    fn test_remove_every_element() {
        let mut set = filled(&[1, 2, 3, 4]);
        let mut cursor = set.cursor();
        let mut removed = 0;
        while cursor.next_config().is_some() {
            cursor.remove().unwrap();
            removed += 1;
        }
        assert_eq!(removed, 4);
        assert!(set.is_empty());
    }
}
