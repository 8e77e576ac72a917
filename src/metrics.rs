use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct CacheStat {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

impl CacheStat {
    fn new(hits: u64, misses: u64) -> Self {
        let total = hits + misses;
        Self {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

impl std::fmt::Display for CacheStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits: {:>8}, misses: {:>8}, hit_rate: {:>6.2}%",
            self.hits,
            self.misses,
            self.hit_rate * 100.0
        )
    }
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub types: usize,
    pub resolve: CacheStat,
    pub predicate: CacheStat,
    pub accelerated_bindings: u64,
    pub generic_bindings: u64,
    pub index_builds: u64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cache Statistics:")?;
        writeln!(f, "  Types:                  {:>8}", self.types)?;
        writeln!(f, "  Resolve Cache:          {}", self.resolve)?;
        writeln!(f, "  Predicate Cache:        {}", self.predicate)?;
        writeln!(f, "  Accelerated Bindings:   {:>8}", self.accelerated_bindings)?;
        writeln!(f, "  Generic Bindings:       {:>8}", self.generic_bindings)?;
        writeln!(f, "  Index Builds:           {:>8}", self.index_builds)?;
        Ok(())
    }
}

/// Metrics counters.
///
/// All counters are independent, so `Ordering::Relaxed` is enough.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub resolve_hits: AtomicU64,
    pub resolve_misses: AtomicU64,
    pub accelerated_bindings: AtomicU64,
    pub generic_bindings: AtomicU64,
    /// Declared and flattened index initializations.
    pub index_builds: AtomicU64,
    pub predicate_hits: AtomicU64,
    pub predicate_misses: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_resolve_hit(&self) {
        self.resolve_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_resolve_miss(&self) {
        self.resolve_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_binding(&self, accelerated: bool) {
        if accelerated {
            self.accelerated_bindings.fetch_add(1, Ordering::Relaxed);
        } else {
            self.generic_bindings.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_index_build(&self) {
        self.index_builds.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_predicate_hit(&self) {
        self.predicate_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_predicate_miss(&self) {
        self.predicate_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, types: usize) -> CacheStats {
        CacheStats {
            types,
            resolve: CacheStat::new(
                self.resolve_hits.load(Ordering::Relaxed),
                self.resolve_misses.load(Ordering::Relaxed),
            ),
            predicate: CacheStat::new(
                self.predicate_hits.load(Ordering::Relaxed),
                self.predicate_misses.load(Ordering::Relaxed),
            ),
            accelerated_bindings: self.accelerated_bindings.load(Ordering::Relaxed),
            generic_bindings: self.generic_bindings.load(Ordering::Relaxed),
            index_builds: self.index_builds.load(Ordering::Relaxed),
        }
    }
}
