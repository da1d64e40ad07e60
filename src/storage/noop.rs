//! Storage backend that discards pages

use crate::storage::traits::{PageStore, StorageResult};
use crate::storage::WebpageRecord;

/// Accepts every page and keeps nothing
///
/// Used when no database path is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl PageStore for NoopStorage {
    fn insert(&self, record: &WebpageRecord) -> StorageResult<()> {
        tracing::trace!("Discarding page {} ({} words)", record.url, record.word_count);
        Ok(())
    }
}
