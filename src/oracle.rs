//! Partition Oracle
//!
//! Memoizes row partitions per attribute set for the duration of one run.
//! The cache is a concurrent map written at most once per key: if two workers
//! compute the same partition at the same time, the first stored value wins
//! and the duplicate is discarded.

use crate::attribute::AttributeSet;
use crate::error::Result;
use crate::partition::Partition;
use crate::source::TabularDataSource;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cache activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleStats {
    pub hits: u64,
    pub misses: u64,
    pub cached: usize,
}

pub struct PartitionOracle {
    source: Arc<dyn TabularDataSource>,
    cache: DashMap<AttributeSet, Arc<Partition>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PartitionOracle {
    pub fn new(source: Arc<dyn TabularDataSource>) -> Self {
        Self {
            source,
            cache: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Partition of the relation by `attributes`, computed on first request
    pub fn partition_of(&self, attributes: &AttributeSet) -> Result<Arc<Partition>> {
        if let Some(cached) = self.cache.get(attributes) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(cached.value()));
        }

        // Computed outside the map so no shard lock is held during the query
        self.misses.fetch_add(1, Ordering::Relaxed);
        let classes = self.source.row_partition(attributes)?;
        let partition = Arc::new(Partition::from_classes(classes)?);
        debug!(
            "Partition by [{}]: {} classes over {} rows",
            attributes,
            partition.len(),
            partition.row_count()
        );

        let stored = self
            .cache
            .entry(attributes.clone())
            .or_insert(partition);
        Ok(Arc::clone(stored.value()))
    }

    /// Drop every cached partition, e.g. before rerunning on a refreshed snapshot
    pub fn clear(&self) {
        self.cache.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> OracleStats {
        OracleStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            cached: self.cache.len(),
        }
    }

    pub fn source(&self) -> &Arc<dyn TabularDataSource> {
        &self.source
    }
}
