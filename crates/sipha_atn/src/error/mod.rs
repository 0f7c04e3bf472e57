//! # Error Types
//!
//! Errors raised by configuration-set operations.
//!
//! ## Overview
//!
//! Every variant of [`ConfigSetError`] reports a caller contract violation:
//!
//! - **Invariant violations**: inserting a hidden or outer-context-reaching
//!   configuration into an outermost set
//! - **Invalid state**: reverting the outermost latch, removing through a
//!   cursor that has nothing to remove, removing past the end of the set
//!
//! None of them are transient. Each check runs before the offending
//! operation mutates anything, so a set that returned an error is left as it
//! was before the call.
//!
//! Mutating a frozen set is not representable: [`FrozenConfigSet`] has no
//! mutating methods at all.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! and carry a stable `config_set::*` code.
//!
//! [`FrozenConfigSet`]: crate::config::FrozenConfigSet
//! [`miette`]: https://docs.rs/miette

use crate::atn::StateId;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors returned by [`AtnConfigSet`](crate::config::AtnConfigSet) and its cursor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ConfigSetError {
    #[error("hidden configuration ({state},{alt}) cannot be added to an outermost configuration set")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(config_set::hidden_in_outermost),
            help("hidden configurations only exist while evaluating predicates during lookahead")
        )
    )]
    HiddenInOutermost { state: StateId, alt: u32 },

    #[error("configuration ({state},{alt}) reaches the outer context of an outermost configuration set")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(config_set::outer_context_in_outermost))
    )]
    OuterContextInOutermost { state: StateId, alt: u32 },

    #[error("configuration set already dips into the outer context and cannot become outermost")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(config_set::dips_into_outer_context))
    )]
    DipsIntoOuterContext,

    #[error("an outermost configuration set cannot be reverted to non-outermost")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(config_set::outermost_latch)))]
    OutermostLatch,

    #[error("no configuration to remove; the cursor has not produced one yet")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(config_set::no_current_config),
            help("call `next_config` before `remove`")
        )
    )]
    NoCurrentConfig,

    #[error("configuration at position {index} was already removed")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(config_set::already_removed)))]
    AlreadyRemoved { index: usize },

    #[error("index {index} is out of bounds for a configuration set of length {len}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(config_set::index_out_of_bounds)))]
    IndexOutOfBounds { index: usize, len: usize },
}

impl ConfigSetError {
    /// Whether this error reports a broken set invariant rather than a
    /// misuse of the set's API
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::HiddenInOutermost { .. }
                | Self::OuterContextInOutermost { .. }
                | Self::DipsIntoOuterContext
        )
    }
}
