//! Writable configuration set
//!
//! Storage is index based: every configuration lives exactly once in
//! `configs`, in insertion order. The representative table maps each merge
//! key to the index of the entry later configurations with that key merge
//! into; the overflow list holds indices of entries that share a key with
//! their representative but carry a different semantic context. Merging
//! updates the entry in place, so positions observed through [`get`] and
//! [`iter`] keep referring to the same logical configuration.
//!
//! [`get`]: AtnConfigSet::get
//! [`iter`]: AtnConfigSet::iter

use super::{AltSet, AtnConfig, ConfigCursor, ConfigKey, ConflictInfo, FrozenConfigSet, SetSummary};
use crate::atn::{Atn, StateId};
use crate::context::{PredictionContext, PredictionContextCache};
use crate::error::ConfigSetError;
use hashbrown::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A configuration set under construction
///
/// Populated by closure through [`add`](Self::add), then frozen with
/// [`freeze`](Self::freeze) for caching.
#[derive(Debug, Clone)]
pub struct AtnConfigSet {
    configs: Vec<AtnConfig>,
    /// Merge target per key, as an index into `configs`
    representatives: HashMap<ConfigKey, usize, ahash::RandomState>,
    /// Indices into `configs` of same-key entries with differing guards
    overflow: Vec<usize>,
    unique_alt: Option<u32>,
    has_semantic_context: bool,
    dips_into_outer_context: bool,
    outermost: bool,
    conflict_info: Option<ConflictInfo>,
}

impl AtnConfigSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty set with room for `capacity` configurations
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            configs: Vec::with_capacity(capacity),
            representatives: HashMap::with_capacity_and_hasher(capacity, ahash::RandomState::new()),
            overflow: Vec::new(),
            unique_alt: None,
            has_semantic_context: false,
            dips_into_outer_context: false,
            outermost: false,
            conflict_info: None,
        }
    }

    /// Empty set carrying over the flags of a frozen set; its entries are
    /// expected to be replayed through `add`
    pub(crate) fn with_flags(
        capacity: usize,
        outermost: bool,
        has_semantic_context: bool,
        dips_into_outer_context: bool,
    ) -> Self {
        Self {
            outermost,
            has_semantic_context,
            dips_into_outer_context,
            ..Self::with_capacity(capacity)
        }
    }

    /// Insert a configuration, merging it into a compatible entry if one
    /// exists
    ///
    /// Returns `true` if a new entry was appended or an existing entry's
    /// context changed as a result of the join.
    ///
    /// # Errors
    ///
    /// Fails without touching the set if this set is outermost and `config`
    /// is hidden ([`ConfigSetError::HiddenInOutermost`]) or reaches the
    /// outer context ([`ConfigSetError::OuterContextInOutermost`]).
    pub fn add(
        &mut self,
        config: AtnConfig,
        cache: &mut PredictionContextCache,
    ) -> Result<bool, ConfigSetError> {
        self.check_insertable(&config)?;

        let key = config.key();
        let representative = self.representatives.get(&key).copied();
        if let Some(index) = representative
            && self.configs[index].can_merge(&config)
        {
            return Ok(self.merge_into(index, &config, cache));
        }

        if let Some(position) = self
            .overflow
            .iter()
            .position(|&index| self.configs[index].can_merge(&config))
        {
            let index = self.overflow[position];
            let changed = self.merge_into(index, &config, cache);
            if representative.is_none() {
                self.overflow.remove(position);
                self.representatives.insert(key, index);
            }
            return Ok(changed);
        }

        let index = self.configs.len();
        if representative.is_none() {
            self.representatives.insert(key, index);
        } else {
            self.overflow.push(index);
        }
        trace!(state = %config.state(), alt = config.alt(), index, "appended configuration");
        self.configs.push(config);
        self.update_properties_for_added(index);
        Ok(true)
    }

    /// Insert a configuration joining contexts without a cache
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn add_uncached(&mut self, config: AtnConfig) -> Result<bool, ConfigSetError> {
        self.add(config, &mut PredictionContextCache::uncached())
    }

    /// Insert every configuration, returning whether any insertion changed
    /// the set
    ///
    /// # Errors
    ///
    /// Stops at the first configuration [`add`](Self::add) rejects; the ones
    /// before it stay inserted.
    pub fn add_all<I>(
        &mut self,
        configs: I,
        cache: &mut PredictionContextCache,
    ) -> Result<bool, ConfigSetError>
    where
        I: IntoIterator<Item = AtnConfig>,
    {
        let mut changed = false;
        for config in configs {
            changed |= self.add(config, cache)?;
        }
        Ok(changed)
    }

    fn check_insertable(&self, config: &AtnConfig) -> Result<(), ConfigSetError> {
        if !self.outermost {
            return Ok(());
        }
        if config.is_hidden() {
            return Err(ConfigSetError::HiddenInOutermost {
                state: config.state(),
                alt: config.alt(),
            });
        }
        if config.reaches_outer_context() {
            return Err(ConfigSetError::OuterContextInOutermost {
                state: config.state(),
                alt: config.alt(),
            });
        }
        Ok(())
    }

    fn merge_into(
        &mut self,
        index: usize,
        config: &AtnConfig,
        cache: &mut PredictionContextCache,
    ) -> bool {
        let target = &mut self.configs[index];
        target.absorb_flags(config);
        let joined = PredictionContext::join(target.context(), config.context(), cache);

        self.dips_into_outer_context |= config.reaches_outer_context();
        debug_assert!(!(self.outermost && self.dips_into_outer_context));

        if Arc::ptr_eq(&joined, target.context()) {
            return false;
        }
        trace!(state = %target.state(), alt = target.alt(), index, "merged context");
        target.set_context(joined);
        true
    }

    fn update_properties_for_added(&mut self, index: usize) {
        let config = &self.configs[index];
        if self.configs.len() == 1 {
            self.unique_alt = Some(config.alt());
        } else if self.unique_alt != Some(config.alt()) {
            self.unique_alt = None;
        }
        self.has_semantic_context |= !config.semantic_context().is_always();
        self.dips_into_outer_context |= config.reaches_outer_context();
        debug_assert!(!(self.outermost && self.dips_into_outer_context));
    }

    /// Number of configurations
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Configuration at `index`, in insertion order
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AtnConfig> {
        self.configs.get(index)
    }

    /// All configurations in insertion order
    #[must_use]
    pub fn as_slice(&self) -> &[AtnConfig] {
        &self.configs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AtnConfig> {
        self.configs.iter()
    }

    /// Single-pass cursor that can remove the configuration it just produced
    pub fn cursor(&mut self) -> ConfigCursor<'_> {
        ConfigCursor::new(self)
    }

    /// Whether some configuration in the set already covers `config`
    #[must_use]
    pub fn contains(&self, config: &AtnConfig) -> bool {
        if let Some(&index) = self.representatives.get(&config.key()) {
            let representative = &self.configs[index];
            if representative.can_merge(config) {
                return representative.contains(config);
            }
        }
        self.overflow
            .iter()
            .any(|&index| self.configs[index].contains(config))
    }

    /// The single alternative shared by every configuration, if any
    #[must_use]
    pub const fn unique_alt(&self) -> Option<u32> {
        self.unique_alt
    }

    /// [`unique_alt`](Self::unique_alt) with [`Atn::INVALID_ALT_NUMBER`]
    /// standing in for "none"
    #[must_use]
    pub fn unique_alt_or_invalid(&self) -> u32 {
        self.unique_alt.unwrap_or(Atn::INVALID_ALT_NUMBER)
    }

    /// Whether any configuration carries a non-trivial semantic context
    #[must_use]
    pub const fn has_semantic_context(&self) -> bool {
        self.has_semantic_context
    }

    /// Whether any inserted configuration reached the outer context
    #[must_use]
    pub const fn dips_into_outer_context(&self) -> bool {
        self.dips_into_outer_context
    }

    #[must_use]
    pub const fn is_outermost(&self) -> bool {
        self.outermost
    }

    /// Latch the set as outermost
    ///
    /// # Errors
    ///
    /// [`ConfigSetError::OutermostLatch`] when trying to clear the latch,
    /// [`ConfigSetError::DipsIntoOuterContext`] when setting it on a set
    /// that already reaches the outer context.
    pub fn set_outermost(&mut self, outermost: bool) -> Result<(), ConfigSetError> {
        if self.outermost && !outermost {
            return Err(ConfigSetError::OutermostLatch);
        }
        if outermost && self.dips_into_outer_context {
            return Err(ConfigSetError::DipsIntoOuterContext);
        }
        self.outermost = outermost;
        Ok(())
    }

    #[must_use]
    pub const fn conflict_info(&self) -> Option<&ConflictInfo> {
        self.conflict_info.as_ref()
    }

    /// Record the conflict computed by the prediction engine
    pub fn set_conflict_info(&mut self, conflict_info: Option<ConflictInfo>) {
        self.conflict_info = conflict_info;
    }

    #[must_use]
    pub fn conflicting_alts(&self) -> Option<&AltSet> {
        self.conflict_info.as_ref().map(ConflictInfo::conflicted_alts)
    }

    #[must_use]
    pub fn is_exact_conflict(&self) -> bool {
        self.conflict_info.as_ref().is_some_and(ConflictInfo::is_exact)
    }

    /// Alternatives represented in the set
    ///
    /// When conflict information is present, the conflicting alternatives
    /// stand for the whole set.
    #[must_use]
    pub fn represented_alternatives(&self) -> AltSet {
        represented_alternatives(&self.configs, self.conflict_info.as_ref())
    }

    /// Distinct states of the configurations
    #[must_use]
    pub fn states(&self) -> HashSet<StateId, ahash::RandomState> {
        self.configs.iter().map(AtnConfig::state).collect()
    }

    /// Remove the configuration at `index`
    ///
    /// If it was the representative of its key, the key is left without a
    /// representative; otherwise it is dropped from the overflow list.
    ///
    /// # Errors
    ///
    /// [`ConfigSetError::IndexOutOfBounds`] if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) -> Result<AtnConfig, ConfigSetError> {
        if index >= self.configs.len() {
            return Err(ConfigSetError::IndexOutOfBounds {
                index,
                len: self.configs.len(),
            });
        }

        let key = self.configs[index].key();
        if self.representatives.get(&key) == Some(&index) {
            self.representatives.remove(&key);
        } else if let Some(position) = self.overflow.iter().position(|&i| i == index) {
            self.overflow.remove(position);
        }

        let removed = self.configs.remove(index);
        for slot in self
            .representatives
            .values_mut()
            .chain(self.overflow.iter_mut())
        {
            if *slot > index {
                *slot -= 1;
            }
        }
        Ok(removed)
    }

    /// Remove every hidden configuration
    pub fn strip_hidden_configs(&mut self) {
        if !self.configs.iter().any(AtnConfig::is_hidden) {
            return;
        }

        let before = self.configs.len();
        let mut remap = Vec::with_capacity(before);
        let mut kept = Vec::with_capacity(before);
        for config in self.configs.drain(..) {
            if config.is_hidden() {
                remap.push(None);
            } else {
                remap.push(Some(kept.len()));
                kept.push(config);
            }
        }
        self.configs = kept;

        self.representatives.retain(|_, slot| match remap[*slot] {
            Some(new_index) => {
                *slot = new_index;
                true
            }
            None => false,
        });
        self.overflow = self.overflow.iter().filter_map(|&i| remap[i]).collect();

        debug!(
            removed = before - self.configs.len(),
            remaining = self.configs.len(),
            "stripped hidden configurations"
        );
    }

    /// Replace every context with its interned equivalent from `atn`
    pub fn optimize_configs(&mut self, atn: &Atn) {
        if self.configs.is_empty() {
            return;
        }
        for config in &mut self.configs {
            let interned = atn.interned_context(config.context());
            config.set_context(interned);
        }
        debug!(
            configs = self.configs.len(),
            interned = atn.interned_context_count(),
            "optimized configuration contexts"
        );
    }

    /// Remove every configuration and reset the aggregate properties
    ///
    /// The outermost latch is kept.
    pub fn clear(&mut self) {
        self.configs.clear();
        self.representatives.clear();
        self.overflow.clear();
        self.unique_alt = None;
        self.has_semantic_context = false;
        self.dips_into_outer_context = false;
        self.conflict_info = None;
    }

    /// Read-only copy for caching
    #[must_use]
    pub fn freeze(&self) -> FrozenConfigSet {
        debug!(configs = self.configs.len(), "froze configuration set");
        FrozenConfigSet::from_parts(
            Arc::from(self.configs.as_slice()),
            self.unique_alt,
            self.has_semantic_context,
            self.dips_into_outer_context,
            self.outermost,
            self.conflict_info.clone(),
        )
    }

    /// Consume the set into its read-only form without copying entries
    #[must_use]
    pub fn into_frozen(self) -> FrozenConfigSet {
        debug!(configs = self.configs.len(), "froze configuration set");
        FrozenConfigSet::from_parts(
            Arc::from(self.configs),
            self.unique_alt,
            self.has_semantic_context,
            self.dips_into_outer_context,
            self.outermost,
            self.conflict_info,
        )
    }

    /// Display including each configuration's context
    #[must_use]
    pub fn display_with_context(&self) -> impl fmt::Display + '_ {
        self.summary(true)
    }

    fn summary(&self, show_context: bool) -> SetSummary<'_> {
        SetSummary {
            configs: &self.configs,
            unique_alt: self.unique_alt,
            has_semantic_context: self.has_semantic_context,
            dips_into_outer_context: self.dips_into_outer_context,
            conflict_info: self.conflict_info.as_ref(),
            show_context,
        }
    }

    #[cfg(test)]
    pub(crate) fn check_partitions(&self) {
        let mut indices: Vec<usize> = self
            .representatives
            .values()
            .copied()
            .chain(self.overflow.iter().copied())
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..self.configs.len()).collect::<Vec<_>>());
        for (key, &index) in &self.representatives {
            assert_eq!(self.configs[index].key(), *key);
        }
    }
}

pub(crate) fn represented_alternatives(
    configs: &[AtnConfig],
    conflict_info: Option<&ConflictInfo>,
) -> AltSet {
    if let Some(conflict) = conflict_info {
        return conflict.conflicted_alts().clone();
    }
    configs.iter().map(AtnConfig::alt).collect()
}

impl Default for AtnConfigSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for AtnConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.outermost == other.outermost
            && self.conflict_info == other.conflict_info
            && self.configs == other.configs
    }
}

impl Eq for AtnConfigSet {}

impl PartialEq<FrozenConfigSet> for AtnConfigSet {
    fn eq(&self, other: &FrozenConfigSet) -> bool {
        self.outermost == other.is_outermost()
            && self.conflict_info.as_ref() == other.conflict_info()
            && self.configs.as_slice() == other.as_slice()
    }
}

impl<'a> IntoIterator for &'a AtnConfigSet {
    type Item = &'a AtnConfig;
    type IntoIter = std::slice::Iter<'a, AtnConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.configs.iter()
    }
}

impl fmt::Display for AtnConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.summary(false), f)
    }
}
