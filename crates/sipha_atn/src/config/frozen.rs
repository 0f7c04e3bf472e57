//! Read-only configuration set
//!
//! A frozen set never changes after it is created. Its configurations sit
//! behind an `Arc<[AtnConfig]>`, so cloning is cheap and the set can be
//! shared by any number of prediction threads, which is what lets decision
//! caches hand out cached states without locking.

use super::set::represented_alternatives;
use super::{AltSet, AtnConfig, AtnConfigSet, ConflictInfo, SetSummary};
use crate::atn::{Atn, StateId};
use crate::context::PredictionContextCache;
use crate::error::ConfigSetError;
use hashbrown::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

/// An immutable, shareable configuration set
#[derive(Debug, Clone)]
pub struct FrozenConfigSet {
    configs: Arc<[AtnConfig]>,
    unique_alt: Option<u32>,
    has_semantic_context: bool,
    dips_into_outer_context: bool,
    outermost: bool,
    conflict_info: Option<ConflictInfo>,
}

impl FrozenConfigSet {
    pub(crate) const fn from_parts(
        configs: Arc<[AtnConfig]>,
        unique_alt: Option<u32>,
        has_semantic_context: bool,
        dips_into_outer_context: bool,
        outermost: bool,
        conflict_info: Option<ConflictInfo>,
    ) -> Self {
        Self {
            configs,
            unique_alt,
            has_semantic_context,
            dips_into_outer_context,
            outermost,
            conflict_info,
        }
    }

    /// Rebuild a writable set from this one
    ///
    /// The writable set starts from the outermost, semantic-context and
    /// outer-context flags of this set, with no unique alternative and no
    /// conflict information, and every configuration is replayed through
    /// [`AtnConfigSet::add`] so merging and the aggregates are recomputed
    /// rather than trusted.
    ///
    /// # Errors
    ///
    /// Propagates the first error [`AtnConfigSet::add`] reports while
    /// replaying.
    pub fn thaw(&self, cache: &mut PredictionContextCache) -> Result<AtnConfigSet, ConfigSetError> {
        let mut set = AtnConfigSet::with_flags(
            self.configs.len(),
            self.outermost,
            self.has_semantic_context,
            self.dips_into_outer_context,
        );
        set.add_all(self.configs.iter().cloned(), cache)?;
        debug!(
            frozen = self.configs.len(),
            rebuilt = set.len(),
            "thawed configuration set"
        );
        Ok(set)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AtnConfig> {
        self.configs.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[AtnConfig] {
        &self.configs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AtnConfig> {
        self.configs.iter()
    }

    /// Whether some configuration in the set already covers `config`
    #[must_use]
    pub fn contains(&self, config: &AtnConfig) -> bool {
        self.configs.iter().any(|existing| existing.contains(config))
    }

    #[must_use]
    pub const fn unique_alt(&self) -> Option<u32> {
        self.unique_alt
    }

    #[must_use]
    pub fn unique_alt_or_invalid(&self) -> u32 {
        self.unique_alt.unwrap_or(Atn::INVALID_ALT_NUMBER)
    }

    #[must_use]
    pub const fn has_semantic_context(&self) -> bool {
        self.has_semantic_context
    }

    #[must_use]
    pub const fn dips_into_outer_context(&self) -> bool {
        self.dips_into_outer_context
    }

    #[must_use]
    pub const fn is_outermost(&self) -> bool {
        self.outermost
    }

    #[must_use]
    pub const fn conflict_info(&self) -> Option<&ConflictInfo> {
        self.conflict_info.as_ref()
    }

    #[must_use]
    pub fn conflicting_alts(&self) -> Option<&AltSet> {
        self.conflict_info.as_ref().map(ConflictInfo::conflicted_alts)
    }

    #[must_use]
    pub fn is_exact_conflict(&self) -> bool {
        self.conflict_info.as_ref().is_some_and(ConflictInfo::is_exact)
    }

    #[must_use]
    pub fn represented_alternatives(&self) -> AltSet {
        represented_alternatives(&self.configs, self.conflict_info.as_ref())
    }

    #[must_use]
    pub fn states(&self) -> HashSet<StateId, ahash::RandomState> {
        self.configs.iter().map(AtnConfig::state).collect()
    }

    /// Whether both sets share the same configuration storage
    #[must_use]
    pub fn shares_configs_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.configs, &other.configs)
    }

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
}

impl PartialEq for FrozenConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.outermost == other.outermost
            && self.conflict_info == other.conflict_info
            && (Arc::ptr_eq(&self.configs, &other.configs) || self.configs == other.configs)
    }
}

impl Eq for FrozenConfigSet {}

impl PartialEq<AtnConfigSet> for FrozenConfigSet {
    fn eq(&self, other: &AtnConfigSet) -> bool {
        other == self
    }
}

impl Hash for FrozenConfigSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.outermost.hash(state);
        self.conflict_info.hash(state);
        self.configs.hash(state);
    }
}

impl<'a> IntoIterator for &'a FrozenConfigSet {
    type Item = &'a AtnConfig;
    type IntoIter = std::slice::Iter<'a, AtnConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.configs.iter()
    }
}

impl fmt::Display for FrozenConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.summary(false), f)
    }
}
