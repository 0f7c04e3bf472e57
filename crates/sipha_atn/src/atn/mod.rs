//! # Augmented Transition Network
//!
//! The graph prediction walks over. Only the parts configuration sets rely
//! on live here: stable state identities, the "no unique alternative"
//! sentinel, and a shared table that interns prediction contexts.
//!
//! ## Context interning
//!
//! Closure produces many structurally equal contexts as separate
//! allocations. [`Atn::interned_context`] maps each one to a canonical
//! instance, recursively canonicalizing parents first, so cached decision
//! states share their call-stack graphs. The table is a [`DashMap`] and can
//! be used from several prediction threads at once.

use crate::context::PredictionContext;
use dashmap::DashMap;
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Stable identity of an ATN state
///
/// State ids are dense: the n-th state added to an [`Atn`] has id `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StateId(u32);

impl StateId {
    /// Create a state id from its raw number
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw state number
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the state number as an index into the state table
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for StateId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role a state plays in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AtnStateKind {
    Basic,
    RuleStart,
    RuleStop,
    BlockStart,
    BlockEnd,
    StarLoopEntry,
    PlusLoopBack,
    LoopEnd,
}

impl AtnStateKind {
    /// Whether prediction has to choose between outgoing transitions here
    #[must_use]
    pub const fn is_decision(self) -> bool {
        matches!(
            self,
            Self::BlockStart | Self::StarLoopEntry | Self::PlusLoopBack
        )
    }
}

/// A node of the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtnState {
    id: StateId,
    kind: AtnStateKind,
    rule_index: u32,
}

impl AtnState {
    #[must_use]
    pub const fn id(&self) -> StateId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> AtnStateKind {
        self.kind
    }

    /// Index of the rule this state belongs to
    #[must_use]
    pub const fn rule_index(&self) -> u32 {
        self.rule_index
    }
}

/// State table plus the shared context interning service
pub struct Atn {
    states: Vec<AtnState>,
    contexts: DashMap<Arc<PredictionContext>, Arc<PredictionContext>, ahash::RandomState>,
}

/// Identity-keyed memo for a single interning pass
type VisitedContexts = HashMap<usize, Arc<PredictionContext>, ahash::RandomState>;

impl Atn {
    /// Reserved alternative number meaning "no unique alternative"
    ///
    /// Real alternatives are numbered from 1.
    pub const INVALID_ALT_NUMBER: u32 = 0;

    /// Create an empty network
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            contexts: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Append a state, returning its id
    ///
    /// # Panics
    ///
    /// Panics if the network already holds `u32::MAX` states.
    pub fn add_state(&mut self, kind: AtnStateKind, rule_index: u32) -> StateId {
        let id = StateId::new(
            u32::try_from(self.states.len()).expect("ATN state count exceeds u32::MAX"),
        );
        self.states.push(AtnState {
            id,
            kind,
            rule_index,
        });
        id
    }

    /// Look up a state by id
    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&AtnState> {
        self.states.get(id.index())
    }

    /// All states, ordered by id
    #[must_use]
    pub fn states(&self) -> &[AtnState] {
        &self.states
    }

    /// Number of states
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if the network has no states
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of canonical contexts interned so far
    #[must_use]
    pub fn interned_context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Map a context to its canonical, interned equivalent
    ///
    /// Parents are interned before the context itself. A context whose
    /// parents were all canonical already is interned as-is; otherwise a new
    /// node is built over the canonical parents and that node is interned.
    /// Empty contexts are process-wide singletons and are returned unchanged.
    #[must_use]
    pub fn interned_context(&self, context: &Arc<PredictionContext>) -> Arc<PredictionContext> {
        let mut visited = VisitedContexts::with_hasher(ahash::RandomState::new());
        self.intern(context, &mut visited)
    }

    fn intern(
        &self,
        context: &Arc<PredictionContext>,
        visited: &mut VisitedContexts,
    ) -> Arc<PredictionContext> {
        if context.is_empty() {
            return Arc::clone(context);
        }

        let address = Arc::as_ptr(context) as usize;
        if let Some(existing) = visited.get(&address) {
            return Arc::clone(existing);
        }

        if let Some(existing) = self.contexts.get(context) {
            let existing = Arc::clone(existing.value());
            visited.insert(address, Arc::clone(&existing));
            return existing;
        }

        let mut parents: Option<SmallVec<[Arc<PredictionContext>; 2]>> = None;
        for i in 0..context.size() {
            let parent = context.parent(i);
            let interned = self.intern(parent, visited);
            if parents.is_none() && !Arc::ptr_eq(&interned, parent) {
                parents = Some((0..i).map(|j| Arc::clone(context.parent(j))).collect());
            }
            if let Some(parents) = parents.as_mut() {
                parents.push(interned);
            }
        }

        let updated = match parents {
            None => Arc::clone(context),
            Some(parents) => {
                let return_states = (0..context.size())
                    .map(|i| context.return_state(i))
                    .collect();
                PredictionContext::from_parts(parents, return_states)
            }
        };

        let canonical = Arc::clone(
            self.contexts
                .entry(Arc::clone(&updated))
                .or_insert(updated)
                .value(),
        );
        visited.insert(address, Arc::clone(&canonical));
        canonical
    }
}

impl Default for Atn {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Atn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atn")
            .field("states", &self.states.len())
            .field("interned_contexts", &self.contexts.len())
            .finish()
    }
}
