use std::sync::Arc;

use crate::dataset::Dataset;
use crate::domain::record::NormalizedRecord;
use crate::normalize::{normalize, NormalizeOptions};

/// Immutable canonical view of a [`Dataset`]; built once and shared across queries.
#[derive(Clone, Debug)]
pub struct NormalizedDataset {
    dataset: Arc<Dataset>,
    options: NormalizeOptions,
    canonical: Vec<(String, String)>,
}

impl NormalizedDataset {
    pub fn new(dataset: Arc<Dataset>, options: NormalizeOptions) -> Self {
        let canonical = dataset
            .records()
            .iter()
            .map(|record| {
                (
                    normalize(Some(&record.discrepancy), &options),
                    normalize(Some(&record.corrective_action), &options),
                )
            })
            .collect();

        Self { dataset, options, canonical }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Records in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = NormalizedRecord<'_>> {
        self.dataset.records().iter().zip(&self.canonical).map(
            |(record, (discrepancy, corrective_action))| NormalizedRecord {
                record,
                discrepancy,
                corrective_action,
            },
        )
    }
}
