//! In-memory collection store.

use super::{CollectionStore, LibraryData, StoreError};

/// A store that never touches the disk
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: LibraryData,
}

impl MemoryStore {
    /// Start with the default project only
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: LibraryData) -> Self {
        Self { data }
    }

    pub fn into_data(self) -> LibraryData {
        self.data
    }
}

impl CollectionStore for MemoryStore {
    fn data(&self) -> &LibraryData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut LibraryData {
        &mut self.data
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.data.last_modified = crate::models::now_rfc3339();
        Ok(())
    }
}
