//! # Context Join Cache
//!
//! Joining contexts recursively joins their parents, and closure joins the
//! same pairs of parents over and over. [`PredictionContextCache`] memoizes
//! those joins by operand identity and canonicalizes every result it
//! produces, so structurally equal joins come back as the *same* `Arc`.
//!
//! The join memo is bounded with an LRU policy; the canonical table lives as
//! long as the cache does (typically one prediction).

use super::PredictionContext;
use hashbrown::HashSet;
use lru::LruCache;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Tunables for [`PredictionContextCache`]
#[derive(Debug, Clone)]
pub struct ContextCacheOptions {
    /// Memoize joins and canonicalize results
    pub enabled: bool,

    /// Maximum number of memoized joins; `0` means unbounded
    pub join_capacity: usize,
}

impl Default for ContextCacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            join_capacity: 4096,
        }
    }
}

/// Commutative, identity-keyed pair of join operands
///
/// The operands are held so their addresses stay valid for as long as the
/// memo entry exists.
#[derive(Clone)]
struct JoinOperands {
    left: Arc<PredictionContext>,
    right: Arc<PredictionContext>,
}

impl PartialEq for JoinOperands {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.left, &other.left) && Arc::ptr_eq(&self.right, &other.right))
            || (Arc::ptr_eq(&self.left, &other.right) && Arc::ptr_eq(&self.right, &other.left))
    }
}

impl Eq for JoinOperands {}

impl Hash for JoinOperands {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let left = Arc::as_ptr(&self.left) as usize;
        let right = Arc::as_ptr(&self.right) as usize;
        state.write_usize(left ^ right);
    }
}

/// Join memo plus canonicalization table for prediction contexts
pub struct PredictionContextCache {
    enabled: bool,
    contexts: HashSet<Arc<PredictionContext>, ahash::RandomState>,
    joins: Option<LruCache<JoinOperands, Arc<PredictionContext>, ahash::RandomState>>,
    hits: u64,
    misses: u64,
}

impl PredictionContextCache {
    /// Create a cache with the given options
    #[must_use]
    pub fn new(options: ContextCacheOptions) -> Self {
        let joins = options.enabled.then(|| {
            NonZeroUsize::new(options.join_capacity).map_or_else(
                || LruCache::unbounded_with_hasher(ahash::RandomState::new()),
                |capacity| LruCache::with_hasher(capacity, ahash::RandomState::new()),
            )
        });
        Self {
            enabled: options.enabled,
            contexts: HashSet::with_hasher(ahash::RandomState::new()),
            joins,
            hits: 0,
            misses: 0,
        }
    }

    /// A cache that neither memoizes nor canonicalizes
    ///
    /// Joins through it still return one of their operands when the result
    /// equals that operand.
    #[must_use]
    pub fn uncached() -> Self {
        Self::new(ContextCacheOptions {
            enabled: false,
            join_capacity: 0,
        })
    }

    /// Whether joins are memoized
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the canonical instance structurally equal to `context`,
    /// registering `context` as canonical if none exists yet
    #[must_use]
    pub fn get_as_cached(&mut self, context: Arc<PredictionContext>) -> Arc<PredictionContext> {
        if !self.enabled {
            return context;
        }
        if let Some(existing) = self.contexts.get(&context) {
            return Arc::clone(existing);
        }
        self.contexts.insert(Arc::clone(&context));
        context
    }

    /// Join two contexts through the memo
    #[must_use]
    pub fn join(
        &mut self,
        left: &Arc<PredictionContext>,
        right: &Arc<PredictionContext>,
    ) -> Arc<PredictionContext> {
        if !self.enabled {
            return PredictionContext::join(left, right, self);
        }

        let operands = JoinOperands {
            left: Arc::clone(left),
            right: Arc::clone(right),
        };
        if let Some(joins) = self.joins.as_mut()
            && let Some(result) = joins.get(&operands)
        {
            self.hits += 1;
            return Arc::clone(result);
        }

        self.misses += 1;
        let joined = PredictionContext::join(left, right, self);
        let joined = self.get_as_cached(joined);
        if let Some(joins) = self.joins.as_mut() {
            joins.put(operands, Arc::clone(&joined));
        }
        joined
    }

    /// Number of canonical contexts
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Check if no context has been canonicalized yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Number of memoized joins
    #[must_use]
    pub fn join_len(&self) -> usize {
        self.joins.as_ref().map_or(0, LruCache::len)
    }

    /// Memo hits and misses so far
    #[must_use]
    pub const fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Drop every memoized join and canonical context
    pub fn clear(&mut self) {
        self.contexts.clear();
        if let Some(joins) = self.joins.as_mut() {
            joins.clear();
        }
        self.hits = 0;
        self.misses = 0;
    }
}

impl Default for PredictionContextCache {
    fn default() -> Self {
        Self::new(ContextCacheOptions::default())
    }
}

impl fmt::Debug for PredictionContextCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionContextCache")
            .field("enabled", &self.enabled)
            .field("contexts", &self.contexts.len())
            .field("joins", &self.join_len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}
