//! # Sipha ATN
//!
//! Configuration sets for adaptive LL(*) prediction.
//!
//! ## Overview
//!
//! Adaptive prediction simulates the grammar's augmented transition network
//! (ATN) to pick an alternative at each decision. Every simulation step
//! produces *configurations*, one per live parse thread, and collects them
//! in a configuration set. This crate provides that set and the pieces it is
//! built from:
//!
//! - **Merge-on-insert**: configurations with the same state, alternative
//!   and predicate merge by joining their call-stack contexts
//! - **Aggregates**: unique alternative, predicate presence and outer-context
//!   reachability are tracked as configurations arrive
//! - **Freeze / thaw**: a converged set is frozen into an immutable,
//!   thread-shareable form for caching, and can be rebuilt into a writable
//!   one
//! - **Persistent contexts**: call stacks are `Arc`-shared graphs with a
//!   canonicalizing, memoized join
//!
//! ## Quick Start
//!
//! ```rust
//! use sipha_atn::atn::StateId;
//! use sipha_atn::config::{AtnConfig, AtnConfigSet};
//! use sipha_atn::context::{PredictionContext, PredictionContextCache};
//! use sipha_atn::semantic::SemanticContext;
//!
//! let mut cache = PredictionContextCache::default();
//! let mut set = AtnConfigSet::new();
//! let root = PredictionContext::empty_full();
//!
//! // Two configurations for the same state and alternative merge ...
//! set.add(AtnConfig::new(StateId::new(5), 1, root.child(10)), &mut cache)?;
//! set.add(AtnConfig::new(StateId::new(5), 1, root.child(20)), &mut cache)?;
//! assert_eq!(set.len(), 1);
//! assert_eq!(set.unique_alt(), Some(1));
//!
//! // ... but a different predicate keeps them apart
//! let guarded = AtnConfig::new(StateId::new(5), 1, root.child(30))
//!     .with_semantic_context(SemanticContext::predicate(0, 0, false));
//! set.add(guarded, &mut cache)?;
//! assert_eq!(set.len(), 2);
//! assert!(set.has_semantic_context());
//!
//! // A second alternative means there is no unique prediction yet
//! set.add(AtnConfig::new(StateId::new(7), 2, root.child(40)), &mut cache)?;
//! assert_eq!(set.unique_alt(), None);
//!
//! // Freeze for caching; the frozen copy compares equal to its source
//! let frozen = set.freeze();
//! assert_eq!(frozen, set);
//! # Ok::<(), sipha_atn::error::ConfigSetError>(())
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configurations and configuration sets
//! - [`context`] - Prediction contexts and the join cache
//! - [`semantic`] - Semantic contexts (predicate guards)
//! - [`atn`] - State identities and context interning
//! - [`error`] - Error types

pub mod atn;
pub mod config;
pub mod context;
pub mod error;
pub mod semantic;

// Re-export commonly used types
pub use atn::{Atn, AtnState, AtnStateKind, StateId};
pub use config::{AltSet, AtnConfig, AtnConfigSet, ConfigCursor, ConfigKey, ConflictInfo, FrozenConfigSet};
pub use context::{ContextCacheOptions, PredictionContext, PredictionContextCache};
pub use error::ConfigSetError;
pub use semantic::SemanticContext;
