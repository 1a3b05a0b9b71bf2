//! Temporary procedure caching with LRU eviction.
//!
//! Generating and creating a temporary stored procedure costs a server
//! round-trip, so procedures are cached per session keyed by the raw SQL
//! text and reused whenever a new invocation's parameter signature is
//! compatible with the cached formals.
//!
//! ## Lifecycle
//!
//! 1. First execution of a parameterized statement generates a procedure
//!    and submits its `create proc` text to the server
//! 2. The procedure is cached by SQL hash; a later execution with a
//!    compatible signature reuses the server-side procedure
//! 3. When the cache is full, LRU eviction returns the evicted procedure
//!    so the session can drop it on the server
//! 4. Session close implicitly drops all temporary procedures

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::params::ParameterDescriptor;
use crate::procedure::Procedure;

/// Default maximum number of procedures to cache per session.
pub const DEFAULT_MAX_PROCEDURES: usize = 256;

/// LRU cache of generated temporary procedures.
///
/// Evicted procedures should have their server-side counterparts dropped
/// by the owning session.
pub struct ProcedureCache {
    /// Cached procedures keyed by raw SQL hash.
    cache: LruCache<u64, Procedure>,
    /// Maximum number of cached procedures.
    max_size: usize,
    /// Total number of cache hits (for diagnostics).
    hits: u64,
    /// Total number of cache misses (for diagnostics).
    misses: u64,
}

impl ProcedureCache {
    /// Create a new procedure cache with the specified maximum size.
    ///
    /// A `max_size` of zero is treated as one.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            max_size: capacity.get(),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a new procedure cache with the default maximum size.
    #[must_use]
    pub fn with_default_size() -> Self {
        Self::new(DEFAULT_MAX_PROCEDURES)
    }

    /// Look up a reusable procedure for a statement and candidate
    /// parameter signature.
    ///
    /// A cached procedure is returned only if the candidate signature
    /// passes the compatibility test; an incompatible signature counts as
    /// a miss and the caller should generate a fresh procedure.
    pub fn lookup(
        &mut self,
        sql: &str,
        candidates: &[ParameterDescriptor],
    ) -> Option<&Procedure> {
        let hash = hash_sql(sql);
        let hit = self
            .cache
            .get(&hash)
            .is_some_and(|proc| proc.compatible_parameters(candidates));
        if hit {
            self.hits += 1;
            tracing::trace!(sql, "procedure cache hit");
            self.cache.peek(&hash)
        } else {
            self.misses += 1;
            tracing::trace!(sql, "procedure cache miss");
            None
        }
    }

    /// Insert a generated procedure into the cache.
    ///
    /// Returns the displaced procedure, if any: either one evicted due to
    /// capacity, or the previous procedure for the same statement when a
    /// regenerated one replaces it. The caller should drop the displaced
    /// procedure on the server.
    pub fn insert(&mut self, procedure: Procedure) -> Option<Procedure> {
        let hash = hash_sql(procedure.raw_sql());
        tracing::debug!(
            sql = procedure.raw_sql(),
            procedure = procedure.name(),
            "caching temporary procedure"
        );

        let evicted = if self.cache.len() >= self.max_size && !self.cache.contains(&hash) {
            self.cache.pop_lru().map(|(_, proc)| proc)
        } else {
            None
        };

        // An eviction and a same-key replacement cannot both happen, so at
        // most one of these is Some.
        evicted.or(self.cache.put(hash, procedure))
    }

    /// Remove the cached procedure for a statement, if present.
    pub fn remove(&mut self, sql: &str) -> Option<Procedure> {
        self.cache.pop(&hash_sql(sql))
    }

    /// Clear all cached procedures.
    ///
    /// Returns the removed procedures; the caller should drop each on the
    /// server.
    pub fn clear(&mut self) -> impl Iterator<Item = Procedure> + '_ {
        let mut procedures = Vec::with_capacity(self.cache.len());
        while let Some((_, proc)) = self.cache.pop_lru() {
            procedures.push(proc);
        }
        tracing::debug!(count = procedures.len(), "cleared procedure cache");
        procedures.into_iter()
    }

    /// Get the number of cached procedures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Get the maximum cache size.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the number of cache hits.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Get the number of cache misses.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl Default for ProcedureCache {
    fn default() -> Self {
        Self::with_default_size()
    }
}

impl std::fmt::Debug for ProcedureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureCache")
            .field("len", &self.cache.len())
            .field("max_size", &self.max_size)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

/// Hash SQL text for cache lookup.
#[must_use]
pub fn hash_sql(sql: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    sql.hash(&mut hasher);
    hasher.finish()
}
