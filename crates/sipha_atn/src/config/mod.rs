//! # ATN Configurations
//!
//! A configuration is one live parse thread during prediction: an ATN state,
//! the alternative being predicted, the call-stack continuation and the
//! predicate guarding it. Closure inserts configurations into an
//! [`AtnConfigSet`], which merges the ones that only differ in context.
//! Once closure converges the set is frozen into a [`FrozenConfigSet`] and
//! cached as a decision state.
//!
//! ## Merge keys
//!
//! Configurations are grouped by [`ConfigKey`] (state and alternative).
//! Within a key, configurations with equal semantic contexts merge by
//! joining their contexts; configurations with different semantic contexts
//! coexist as separate entries.

pub mod alts;
pub mod cursor;
pub mod frozen;
pub mod set;

pub use alts::{AltSet, ConflictInfo};
pub use cursor::ConfigCursor;
pub use frozen::FrozenConfigSet;
pub use set::AtnConfigSet;

use crate::atn::StateId;
use crate::context::PredictionContext;
use crate::semantic::SemanticContext;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Merge key of a configuration: its state and alternative
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigKey {
    pub state: StateId,
    pub alt: u32,
}

/// A single (state, alternative, context, predicate) parse thread
#[derive(Debug, Clone)]
pub struct AtnConfig {
    state: StateId,
    alt: u32,
    context: Arc<PredictionContext>,
    semantic_context: Arc<SemanticContext>,
    outer_context_depth: u32,
    reaches_outer_context: bool,
    hidden: bool,
    precedence_filter_suppressed: bool,
}

impl AtnConfig {
    /// Create an unguarded configuration
    ///
    /// Alternatives are numbered from 1.
    #[must_use]
    pub fn new(state: StateId, alt: u32, context: Arc<PredictionContext>) -> Self {
        debug_assert!(alt > 0, "alternative numbers start at 1");
        Self {
            state,
            alt,
            context,
            semantic_context: SemanticContext::always(),
            outer_context_depth: 0,
            reaches_outer_context: false,
            hidden: false,
            precedence_filter_suppressed: false,
        }
    }

    /// Guard this configuration with a semantic context
    #[must_use]
    pub fn with_semantic_context(mut self, semantic_context: Arc<SemanticContext>) -> Self {
        self.semantic_context = semantic_context;
        self
    }

    /// Record how many rule invocations closure popped past the decision's
    /// own invocation; a non-zero depth also marks the configuration as
    /// reaching the outer context
    #[must_use]
    pub fn with_outer_context_depth(mut self, depth: u32) -> Self {
        self.outer_context_depth = depth;
        self.reaches_outer_context |= depth > 0;
        self
    }

    #[must_use]
    pub fn with_reaches_outer_context(mut self, reaches: bool) -> Self {
        self.reaches_outer_context = reaches;
        self
    }

    /// Mark as a side effect of predicate evaluation during lookahead
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn with_precedence_filter_suppressed(mut self, suppressed: bool) -> Self {
        self.precedence_filter_suppressed = suppressed;
        self
    }

    /// Copy this configuration onto another state and context, keeping the
    /// alternative, guard and flags
    #[must_use]
    pub fn transition(&self, state: StateId, context: Arc<PredictionContext>) -> Self {
        Self {
            state,
            context,
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn state(&self) -> StateId {
        self.state
    }

    #[must_use]
    pub const fn alt(&self) -> u32 {
        self.alt
    }

    #[must_use]
    pub const fn context(&self) -> &Arc<PredictionContext> {
        &self.context
    }

    #[must_use]
    pub const fn semantic_context(&self) -> &Arc<SemanticContext> {
        &self.semantic_context
    }

    #[must_use]
    pub const fn outer_context_depth(&self) -> u32 {
        self.outer_context_depth
    }

    #[must_use]
    pub const fn reaches_outer_context(&self) -> bool {
        self.reaches_outer_context
    }

    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub const fn is_precedence_filter_suppressed(&self) -> bool {
        self.precedence_filter_suppressed
    }

    /// Merge key of this configuration
    #[must_use]
    pub const fn key(&self) -> ConfigKey {
        ConfigKey {
            state: self.state,
            alt: self.alt,
        }
    }

    /// Whether `other` can be merged into `self` by joining contexts
    #[must_use]
    pub fn can_merge(&self, other: &Self) -> bool {
        self.state == other.state
            && self.key() == other.key()
            && same_semantic_context(&self.semantic_context, &other.semantic_context)
    }

    /// Whether `self` already covers `other`: same state, alternative and
    /// guard, with every continuation of `other` among those of `self`
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.key() == other.key()
            && same_semantic_context(&self.semantic_context, &other.semantic_context)
            && self.context.contains(&other.context)
    }

    /// Display including the context
    #[must_use]
    pub const fn display_with_context(&self) -> ConfigDisplay<'_> {
        ConfigDisplay {
            config: self,
            show_context: true,
        }
    }

    pub(crate) fn set_context(&mut self, context: Arc<PredictionContext>) {
        self.context = context;
    }

    pub(crate) fn absorb_flags(&mut self, other: &Self) {
        self.outer_context_depth = self.outer_context_depth.max(other.outer_context_depth);
        self.precedence_filter_suppressed |= other.precedence_filter_suppressed;
    }
}

fn same_semantic_context(a: &Arc<SemanticContext>, b: &Arc<SemanticContext>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

impl PartialEq for AtnConfig {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.alt == other.alt
            && self.reaches_outer_context == other.reaches_outer_context
            && self.hidden == other.hidden
            && self.precedence_filter_suppressed == other.precedence_filter_suppressed
            && (Arc::ptr_eq(&self.context, &other.context) || self.context == other.context)
            && same_semantic_context(&self.semantic_context, &other.semantic_context)
    }
}

impl Eq for AtnConfig {}

impl Hash for AtnConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.hash(state);
        self.alt.hash(state);
        self.reaches_outer_context.hash(state);
        self.hidden.hash(state);
        self.context.hash_code().hash(state);
        self.semantic_context.hash(state);
    }
}

/// Renders a configuration as `(state,alt[,context][,guard][,up=depth])`
pub struct ConfigDisplay<'a> {
    config: &'a AtnConfig,
    show_context: bool,
}

impl fmt::Display for ConfigDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config;
        write!(f, "({},{}", config.state, config.alt)?;
        if self.show_context {
            write!(f, ",[{}]", config.context)?;
        }
        if !config.semantic_context.is_always() {
            write!(f, ",{}", config.semantic_context)?;
        }
        if config.reaches_outer_context {
            write!(f, ",up={}", config.outer_context_depth)?;
        }
        if config.hidden {
            f.write_str(",hidden")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for AtnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display = ConfigDisplay {
            config: self,
            show_context: false,
        };
        fmt::Display::fmt(&display, f)
    }
}

/// Aggregate view shared by the writable and frozen set displays
pub(crate) struct SetSummary<'a> {
    pub configs: &'a [AtnConfig],
    pub unique_alt: Option<u32>,
    pub has_semantic_context: bool,
    pub dips_into_outer_context: bool,
    pub conflict_info: Option<&'a ConflictInfo>,
    pub show_context: bool,
}

impl fmt::Display for SetSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<(&AtnConfig, String)> = self
            .configs
            .iter()
            .map(|config| (config, config.semantic_context.to_string()))
            .collect();
        sorted.sort_by(|(a, a_guard), (b, b_guard)| {
            a.alt
                .cmp(&b.alt)
                .then(a.state.cmp(&b.state))
                .then_with(|| a_guard.cmp(b_guard))
        });

        f.write_str("[")?;
        for (i, (config, _)) in sorted.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let display = ConfigDisplay {
                config,
                show_context: self.show_context,
            };
            fmt::Display::fmt(&display, f)?;
        }
        f.write_str("]")?;

        if self.has_semantic_context {
            f.write_str(",hasSemanticContext=true")?;
        }
        if let Some(alt) = self.unique_alt {
            write!(f, ",uniqueAlt={alt}")?;
        }
        if let Some(conflict) = self.conflict_info {
            write!(f, ",conflictingAlts={}", conflict.conflicted_alts())?;
            if !conflict.is_exact() {
                f.write_str("*")?;
            }
        }
        if self.dips_into_outer_context {
            f.write_str(",dipsIntoOuterContext")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(return_state: u32) -> Arc<PredictionContext> {
        PredictionContext::empty_full().child(return_state)
    }

    #[test]
    fn test_key_and_can_merge() {
        let a = AtnConfig::new(StateId::new(5), 1, ctx(10));
        let b = AtnConfig::new(StateId::new(5), 1, ctx(20));
        let c = AtnConfig::new(StateId::new(5), 2, ctx(10));
        let d = b
            .clone()
            .with_semantic_context(SemanticContext::predicate(0, 0, false));

        assert_eq!(a.key(), b.key());
        assert!(a.can_merge(&b));
        assert!(!a.can_merge(&c));
        assert!(!a.can_merge(&d));
    }

    #[test]
    fn test_equality_includes_context() {
        let a = AtnConfig::new(StateId::new(1), 1, ctx(10));
        let b = AtnConfig::new(StateId::new(1), 1, ctx(10));
        let c = AtnConfig::new(StateId::new(1), 1, ctx(11));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, b.clone().hidden());
    }

    #[test]
    fn test_outer_context_depth_marks_reaching() {
        let config = AtnConfig::new(StateId::new(1), 1, ctx(1)).with_outer_context_depth(2);
        assert!(config.reaches_outer_context());
        assert_eq!(config.outer_context_depth(), 2);
    }

    #[test]
    fn test_transition_keeps_alt_and_guard() {
        let guard = SemanticContext::predicate(1, 1, false);
        let config = AtnConfig::new(StateId::new(1), 3, ctx(1)).with_semantic_context(guard.clone());
        let moved = config.transition(StateId::new(8), ctx(2));
        assert_eq!(moved.state(), StateId::new(8));
        assert_eq!(moved.alt(), 3);
        assert_eq!(moved.semantic_context(), &guard);
    }

    #[test]
    fn test_display() {
        let config = AtnConfig::new(StateId::new(4), 2, ctx(9))
            .with_semantic_context(SemanticContext::predicate(0, 1, false))
            .with_outer_context_depth(1);
        assert_eq!(config.to_string(), "(4,2,{0:1}?,up=1)");
        assert_eq!(
            config.display_with_context().to_string(),
            "(4,2,[9],{0:1}?,up=1)"
        );
    }
}
