//! Label table
//!
//! Fixed table of advertised network names (SSIDs), editable in place by index.

use crate::{BeaconError, config};
use heapless::String;

/// One advertised network name
pub type Label = String<{ config::LABEL_CAPACITY }>;

/// Ordered table of exactly [`config::LABEL_COUNT`] labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    entries: [Label; config::LABEL_COUNT],
}

impl LabelTable {
    /// Create a table holding [`config::DEFAULT_LABELS`]
    pub fn new() -> Self {
        let mut entries: [Label; config::LABEL_COUNT] = Default::default();
        for (entry, text) in entries.iter_mut().zip(config::DEFAULT_LABELS) {
            // Defaults are checked against the capacity by the config tests
            entry.push_str(text).ok();
        }
        Self { entries }
    }

    /// Check that `text` is acceptable as a label
    pub fn validate(text: &str) -> Result<(), BeaconError> {
        if text.is_empty() || text.len() >= config::LABEL_CAPACITY {
            return Err(BeaconError::InvalidLabelLength);
        }
        Ok(())
    }

    /// Replace the label at `index`.
    ///
    /// Nothing changes when the index or the text is rejected.
    pub fn set(&mut self, index: usize, text: &str) -> Result<&str, BeaconError> {
        if index >= config::LABEL_COUNT {
            return Err(BeaconError::InvalidIndex);
        }
        Self::validate(text)?;

        let entry = &mut self.entries[index];
        entry.clear();
        entry
            .push_str(text)
            .map_err(|_| BeaconError::InvalidLabelLength)?;
        Ok(entry.as_str())
    }

    /// Label at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|entry| entry.as_str())
    }

    /// All labels in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (index, entry.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new()
    }
}
