use std::sync::Arc;

use tracing::debug;

use crate::dataset::{content_hash, Dataset, NormalizedDataset};
use crate::errors::FairQuoteError;
use crate::normalize::NormalizeOptions;

#[derive(Clone, Debug, PartialEq, Eq)]
struct CacheKey {
    content_hash: String,
    options: NormalizeOptions,
}

/// Holds the snapshot of the most recently loaded file.
///
/// Loading different bytes, or the same bytes with other normalization options,
/// replaces the snapshot outright. A failed load leaves the cache empty.
#[derive(Debug, Default)]
pub struct DatasetCache {
    current: Option<(CacheKey, Arc<NormalizedDataset>)>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(
        &mut self,
        bytes: &[u8],
        options: NormalizeOptions,
    ) -> Result<Arc<NormalizedDataset>, FairQuoteError> {
        let key = CacheKey { content_hash: content_hash(bytes), options };

        if let Some((cached_key, snapshot)) = &self.current {
            if *cached_key == key {
                debug!(event_name = "dataset.cache_hit", content_hash = %key.content_hash);
                return Ok(Arc::clone(snapshot));
            }
        }

        self.current = None;
        debug!(event_name = "dataset.cache_miss", content_hash = %key.content_hash);
        let dataset = Dataset::from_xlsx_bytes(bytes)?;
        let snapshot = Arc::new(NormalizedDataset::new(Arc::new(dataset), options));
        self.current = Some((key, Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    pub fn current(&self) -> Option<Arc<NormalizedDataset>> {
        self.current.as_ref().map(|(_, snapshot)| Arc::clone(snapshot))
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
