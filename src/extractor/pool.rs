//! Extractor instance pool.
//!
//! A parse allocates heavily across the extractor's vectors and maps;
//! reusing a reset instance keeps that capacity warm, which is the
//! dominant allocation win for bulk indexing.

use super::UnifiedExtractor;
use parking_lot::Mutex;

/// Pool of reusable [`UnifiedExtractor`] instances.
pub struct ExtractorPool {
    idle: Mutex<Vec<UnifiedExtractor>>,
    max_idle: usize,
}

impl ExtractorPool {
    pub fn new() -> Self {
        Self::with_capacity(8)
    }

    pub fn with_capacity(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Pop an idle extractor, or construct a fresh one.
    pub fn acquire(&self) -> UnifiedExtractor {
        self.idle
            .lock()
            .pop()
            .unwrap_or_else(UnifiedExtractor::new)
    }

    /// Reset and return an extractor; extras beyond the cap are dropped.
    pub fn release(&self, mut extractor: UnifiedExtractor) {
        extractor.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(extractor);
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

impl Default for ExtractorPool {
    fn default() -> Self {
        Self::new()
    }
}
