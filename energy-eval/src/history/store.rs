//! Ordered iteration-index → record store.

use crate::error::{EvalError, EvalResult};
use crate::history::comparison::{Comparison, IndexedRecord};
use crate::record::EnergyRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Optimization history of one benchmark target.
///
/// Indices only ever grow. Gaps are allowed: an iteration whose candidate
/// never reached measurement leaves no entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    records: BTreeMap<usize, EnergyRecord>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history holding the baseline at index 0.
    pub fn with_baseline(baseline: EnergyRecord) -> Self {
        let mut history = Self::new();
        history.records.insert(0, baseline);
        history
    }

    /// Highest recorded index, if any.
    pub fn last_index(&self) -> Option<usize> {
        self.records.keys().next_back().copied()
    }

    /// Index the next [`append`](Self::append) will use.
    pub fn next_index(&self) -> usize {
        self.last_index().map_or(0, |last| last + 1)
    }

    /// Insert at the next index and return it.
    pub fn append(&mut self, record: EnergyRecord) -> usize {
        let index = self.next_index();
        self.records.insert(index, record);
        index
    }

    /// Insert at an explicit index.
    ///
    /// Fails with [`EvalError::HistoryOrder`] unless `index` is strictly
    /// greater than every recorded index.
    pub fn insert_at(&mut self, index: usize, record: EnergyRecord) -> EvalResult<()> {
        if let Some(last) = self.last_index() {
            if index <= last {
                return Err(EvalError::HistoryOrder { index, last });
            }
        }
        self.records.insert(index, record);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&EnergyRecord> {
        self.records.get(&index)
    }

    pub fn baseline(&self) -> Option<&EnergyRecord> {
        self.records.get(&0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &EnergyRecord)> {
        self.records.iter().map(|(i, r)| (*i, r))
    }

    /// Build the original / lowest-energy / current comparison.
    ///
    /// Returns `None` only for an empty history. Ties on energy go to the
    /// earliest index.
    pub fn extract_comparison(&self) -> Option<Comparison> {
        let (first_index, first) = self.records.iter().next()?;
        let (last_index, last) = self.records.iter().next_back()?;

        let mut lowest = (*first_index, first);
        for (index, record) in self.records.iter() {
            if record.avg_energy() < lowest.1.avg_energy() {
                lowest = (*index, record);
            }
        }

        Some(Comparison {
            original: IndexedRecord::new(*first_index, first),
            lowest_avg_energy: IndexedRecord::new(lowest.0, lowest.1),
            current: IndexedRecord::new(*last_index, last),
        })
    }
}
