//! # Prediction Contexts
//!
//! A prediction context is the call-stack continuation of a configuration:
//! the return states prediction would pop back to once the current rule
//! finishes. Contexts form a persistent graph. Nodes are immutable, shared
//! through `Arc`, and a node's parents are themselves contexts, so forks of
//! the same call stack share their common suffix the way GLR stacks share
//! their prefixes.
//!
//! ## Node shapes
//!
//! - **Empty**: no further return states. The *local* empty context is a
//!   wildcard: it stands for "any caller" and absorbs whatever it is joined
//!   with. The *full* empty context means "return to the outermost
//!   invocation" and is kept as an explicit path when joined.
//! - **Singleton**: one return state over one parent.
//! - **Array**: several `(return state, parent)` paths, sorted by return
//!   state. The full empty path is encoded as [`EMPTY_FULL_STATE_KEY`] and
//!   therefore always sorts last.
//!
//! ## Joining
//!
//! [`PredictionContext::join`] combines two contexts into one that stands
//! for either continuation. Whenever the result is structurally equal to one
//! of the inputs, that input itself is returned; configuration sets rely on
//! this identity to detect that a merge changed nothing.

pub mod cache;

pub use cache::{ContextCacheOptions, PredictionContextCache};

use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Return-state key of the full empty path inside an array context
pub const EMPTY_FULL_STATE_KEY: u32 = u32::MAX;

type Parents = SmallVec<[Arc<PredictionContext>; 2]>;
type ReturnStates = SmallVec<[u32; 2]>;

#[derive(Clone)]
enum ContextNode {
    Empty {
        full: bool,
    },
    Singleton {
        parent: Arc<PredictionContext>,
        return_state: u32,
    },
    Array {
        parents: Parents,
        return_states: ReturnStates,
    },
}

/// A node of the persistent call-stack graph
///
/// Equality is structural and short-circuits on identity and on the hash
/// computed when the node was built.
#[derive(Clone)]
pub struct PredictionContext {
    node: ContextNode,
    hash: u64,
}

static EMPTY_LOCAL: OnceLock<Arc<PredictionContext>> = OnceLock::new();
static EMPTY_FULL: OnceLock<Arc<PredictionContext>> = OnceLock::new();

impl PredictionContext {
    /// The wildcard empty context
    #[must_use]
    pub fn empty_local() -> Arc<Self> {
        Arc::clone(EMPTY_LOCAL.get_or_init(|| Self::build(ContextNode::Empty { full: false })))
    }

    /// The empty context of the outermost invocation
    #[must_use]
    pub fn empty_full() -> Arc<Self> {
        Arc::clone(EMPTY_FULL.get_or_init(|| Self::build(ContextNode::Empty { full: true })))
    }

    /// Create a context with a single return state over `parent`
    #[must_use]
    pub fn singleton(parent: Arc<Self>, return_state: u32) -> Arc<Self> {
        if return_state == EMPTY_FULL_STATE_KEY {
            return Self::empty_full();
        }
        Self::build(ContextNode::Singleton {
            parent,
            return_state,
        })
    }

    /// Push `return_state` on top of this context
    #[must_use]
    pub fn child(self: &Arc<Self>, return_state: u32) -> Arc<Self> {
        Self::singleton(Arc::clone(self), return_state)
    }

    /// Build a context from parallel parent/return-state lists
    ///
    /// The lists must have equal length and the return states must be sorted
    /// in ascending order. Zero paths yield the full empty context and one
    /// path yields a singleton.
    ///
    /// # Panics
    ///
    /// Panics if the two lists differ in length.
    #[must_use]
    pub fn from_parts(parents: Parents, return_states: ReturnStates) -> Arc<Self> {
        assert_eq!(
            parents.len(),
            return_states.len(),
            "every return state needs exactly one parent"
        );
        debug_assert!(return_states.windows(2).all(|w| w[0] < w[1]));
        match parents.len() {
            0 => Self::empty_full(),
            1 => Self::singleton(Arc::clone(&parents[0]), return_states[0]),
            _ => Self::build(ContextNode::Array {
                parents,
                return_states,
            }),
        }
    }

    fn build(node: ContextNode) -> Arc<Self> {
        let hash = Self::compute_hash(&node);
        Arc::new(Self { node, hash })
    }

    fn compute_hash(node: &ContextNode) -> u64 {
        let mut hasher = ahash::AHasher::default();
        match node {
            ContextNode::Empty { full } => {
                0u8.hash(&mut hasher);
                full.hash(&mut hasher);
            }
            ContextNode::Singleton {
                parent,
                return_state,
            } => {
                1u8.hash(&mut hasher);
                parent.hash.hash(&mut hasher);
                return_state.hash(&mut hasher);
            }
            ContextNode::Array {
                parents,
                return_states,
            } => {
                2u8.hash(&mut hasher);
                for (parent, return_state) in parents.iter().zip(return_states) {
                    parent.hash.hash(&mut hasher);
                    return_state.hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }

    /// Number of `(return state, parent)` paths; zero for empty contexts
    #[must_use]
    pub fn size(&self) -> usize {
        match &self.node {
            ContextNode::Empty { .. } => 0,
            ContextNode::Singleton { .. } => 1,
            ContextNode::Array { parents, .. } => parents.len(),
        }
    }

    /// Parent of the `index`-th path
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.size()`.
    #[must_use]
    pub fn parent(&self, index: usize) -> &Arc<Self> {
        match &self.node {
            ContextNode::Singleton { parent, .. } if index == 0 => parent,
            ContextNode::Array { parents, .. } => &parents[index],
            _ => panic!("context path index {index} out of bounds"),
        }
    }

    /// Return state of the `index`-th path
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.size()`.
    #[must_use]
    pub fn return_state(&self, index: usize) -> u32 {
        match &self.node {
            ContextNode::Singleton { return_state, .. } if index == 0 => *return_state,
            ContextNode::Array { return_states, .. } => return_states[index],
            _ => panic!("context path index {index} out of bounds"),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.node, ContextNode::Empty { .. })
    }

    #[must_use]
    pub const fn is_empty_local(&self) -> bool {
        matches!(self.node, ContextNode::Empty { full: false })
    }

    #[must_use]
    pub const fn is_empty_full(&self) -> bool {
        matches!(self.node, ContextNode::Empty { full: true })
    }

    /// Whether one of the paths returns to the outermost invocation
    #[must_use]
    pub fn has_empty(&self) -> bool {
        match &self.node {
            ContextNode::Empty { .. } => true,
            ContextNode::Singleton { return_state, .. } => *return_state == EMPTY_FULL_STATE_KEY,
            ContextNode::Array { return_states, .. } => {
                return_states.last() == Some(&EMPTY_FULL_STATE_KEY)
            }
        }
    }

    /// Structural hash, computed once when the node was built
    #[must_use]
    pub const fn hash_code(&self) -> u64 {
        self.hash
    }

    /// Number of distinct nodes reachable from this one, itself included
    #[must_use]
    pub fn node_count(self: &Arc<Self>) -> usize {
        let mut seen = hashbrown::HashSet::with_hasher(ahash::RandomState::new());
        let mut pending = vec![Arc::clone(self)];
        while let Some(context) = pending.pop() {
            if !seen.insert(Arc::as_ptr(&context) as usize) {
                continue;
            }
            for i in 0..context.size() {
                pending.push(Arc::clone(context.parent(i)));
            }
        }
        seen.len()
    }

    /// Whether every continuation of `other` is also a continuation of `self`
    #[must_use]
    pub fn contains(self: &Arc<Self>, other: &Arc<Self>) -> bool {
        let joined = Self::join(self, other, &mut PredictionContextCache::uncached());
        Arc::ptr_eq(&joined, self) || *joined == **self
    }

    /// Add the full empty path to `context` unless it already has one
    #[must_use]
    pub fn add_empty(context: &Arc<Self>) -> Arc<Self> {
        if context.has_empty() {
            return Arc::clone(context);
        }
        let mut parents: Parents = (0..context.size())
            .map(|i| Arc::clone(context.parent(i)))
            .collect();
        let mut return_states: ReturnStates =
            (0..context.size()).map(|i| context.return_state(i)).collect();
        parents.push(Self::empty_full());
        return_states.push(EMPTY_FULL_STATE_KEY);
        Self::from_parts(parents, return_states)
    }

    /// Join two contexts into one representing either continuation
    ///
    /// Parents reached through the same return state are joined recursively
    /// through `cache`, which memoizes those joins and canonicalizes their
    /// results. If the join equals `left` (or `right`), that exact instance
    /// is returned.
    #[must_use]
    pub fn join(
        left: &Arc<Self>,
        right: &Arc<Self>,
        cache: &mut PredictionContextCache,
    ) -> Arc<Self> {
        if Arc::ptr_eq(left, right) || **left == **right {
            return Arc::clone(left);
        }

        if left.is_empty() {
            return if left.is_empty_local() {
                Arc::clone(left)
            } else {
                Self::add_empty(right)
            };
        }
        if right.is_empty() {
            return if right.is_empty_local() {
                Arc::clone(right)
            } else {
                Self::add_empty(left)
            };
        }

        let (left_size, right_size) = (left.size(), right.size());
        if left_size == 1 && right_size == 1 && left.return_state(0) == right.return_state(0) {
            let merged = cache.join(left.parent(0), right.parent(0));
            if same_context(&merged, left.parent(0)) {
                return Arc::clone(left);
            }
            if same_context(&merged, right.parent(0)) {
                return Arc::clone(right);
            }
            return merged.child(left.return_state(0));
        }

        let mut parents = Parents::with_capacity(left_size + right_size);
        let mut return_states = ReturnStates::with_capacity(left_size + right_size);
        let (mut l, mut r) = (0, 0);
        let mut can_return_left = true;
        let mut can_return_right = true;

        while l < left_size && r < right_size {
            let (left_state, right_state) = (left.return_state(l), right.return_state(r));
            if left_state == right_state {
                let parent = cache.join(left.parent(l), right.parent(r));
                can_return_left &= same_context(&parent, left.parent(l));
                can_return_right &= same_context(&parent, right.parent(r));
                parents.push(parent);
                return_states.push(left_state);
                l += 1;
                r += 1;
            } else if left_state < right_state {
                parents.push(Arc::clone(left.parent(l)));
                return_states.push(left_state);
                can_return_right = false;
                l += 1;
            } else {
                parents.push(Arc::clone(right.parent(r)));
                return_states.push(right_state);
                can_return_left = false;
                r += 1;
            }
        }

        for i in l..left_size {
            parents.push(Arc::clone(left.parent(i)));
            return_states.push(left.return_state(i));
            can_return_right = false;
        }
        for i in r..right_size {
            parents.push(Arc::clone(right.parent(i)));
            return_states.push(right.return_state(i));
            can_return_left = false;
        }

        if can_return_left {
            return Arc::clone(left);
        }
        if can_return_right {
            return Arc::clone(right);
        }
        Self::from_parts(parents, return_states)
    }
}

impl PartialEq for PredictionContext {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.hash != other.hash {
            return false;
        }
        match (&self.node, &other.node) {
            (ContextNode::Empty { full: a }, ContextNode::Empty { full: b }) => a == b,
            (
                ContextNode::Singleton {
                    parent: left_parent,
                    return_state: left_state,
                },
                ContextNode::Singleton {
                    parent: right_parent,
                    return_state: right_state,
                },
            ) => left_state == right_state && same_context(left_parent, right_parent),
            (
                ContextNode::Array {
                    parents: left_parents,
                    return_states: left_states,
                },
                ContextNode::Array {
                    parents: right_parents,
                    return_states: right_states,
                },
            ) => {
                left_states == right_states
                    && left_parents
                        .iter()
                        .zip(right_parents)
                        .all(|(a, b)| same_context(a, b))
            }
            _ => false,
        }
    }
}

impl Eq for PredictionContext {}

impl Hash for PredictionContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

fn same_context(a: &Arc<PredictionContext>, b: &Arc<PredictionContext>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

impl fmt::Display for PredictionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            ContextNode::Empty { full: true } => f.write_str("$"),
            ContextNode::Empty { full: false } => f.write_str("*"),
            ContextNode::Singleton {
                parent,
                return_state,
            } => write_path(f, *return_state, parent),
            ContextNode::Array {
                parents,
                return_states,
            } => {
                f.write_str("[")?;
                for (i, (parent, return_state)) in parents.iter().zip(return_states).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_path(f, *return_state, parent)?;
                }
                f.write_str("]")
            }
        }
    }
}

fn write_path(
    f: &mut fmt::Formatter<'_>,
    return_state: u32,
    parent: &PredictionContext,
) -> fmt::Result {
    if return_state == EMPTY_FULL_STATE_KEY {
        return f.write_str("$");
    }
    if parent.is_empty_full() {
        write!(f, "{return_state}")
    } else {
        write!(f, "{return_state} {parent}")
    }
}

impl fmt::Debug for PredictionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PredictionContext({self})")
    }
}
