//! In-process [`SecretStore`] backed by a concurrent map.

use super::{SecretRecord, SecretStore, StoreError, StoreResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::instrument;

/// Secret store holding records in memory, keyed by handle
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    records: DashMap<String, SecretRecord>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SecretStore for InMemorySecretStore {
    #[instrument(skip(self, record), fields(handle = %record.handle), name = "store_save_secret")]
    fn save_secret(&self, record: SecretRecord) -> StoreResult<()> {
        match self.records.entry(record.handle.clone()) {
            Entry::Occupied(_) => Err(StoreError::already_exists(record.handle)),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }

    #[instrument(skip(self), name = "store_get_secret")]
    fn get_secret(&self, handle: &str) -> StoreResult<SecretRecord> {
        self.records
            .get(handle)
            .map(|record| record.value().clone())
            .ok_or_else(|| StoreError::not_found(handle))
    }

    #[instrument(skip(self, record), fields(new_handle = %record.handle), name = "store_update_secret")]
    fn update_secret(&self, current_handle: &str, record: SecretRecord) -> StoreResult<()> {
        if record.handle == current_handle {
            return match self.records.get_mut(current_handle) {
                Some(mut existing) => {
                    *existing = record;
                    Ok(())
                }
                None => Err(StoreError::not_found(current_handle)),
            };
        }

        // Rename: publish under the new handle, then retire the old one. The old handle
        // is only ever removed if it still holds this record, and at most one shard lock
        // is held at a time.
        let id = self
            .records
            .get(current_handle)
            .map(|existing| existing.id.clone())
            .ok_or_else(|| StoreError::not_found(current_handle))?;
        let new_handle = record.handle.clone();

        match self.records.entry(new_handle.clone()) {
            Entry::Occupied(entry) if entry.get().id != id => {
                return Err(StoreError::already_exists(new_handle));
            }
            Entry::Occupied(mut entry) => {
                entry.insert(record);
            }
            Entry::Vacant(entry) => {
                entry.insert(record);
            }
        }

        if self.records.remove_if(current_handle, |_, existing| existing.id == id).is_none() {
            // The old handle was deleted or reused while renaming; undo our insert only.
            self.records.remove_if(&new_handle, |_, existing| existing.id == id);
            return Err(StoreError::not_found(current_handle));
        }

        Ok(())
    }

    #[instrument(skip(self), name = "store_delete_secret")]
    fn delete_secret(&self, handle: &str) -> StoreResult<()> {
        self.records.remove(handle).map(|_| ()).ok_or_else(|| StoreError::not_found(handle))
    }

    fn secret_exists(&self, handle: &str) -> StoreResult<bool> {
        Ok(self.records.contains_key(handle))
    }

    fn get_secrets(&self) -> StoreResult<Vec<String>> {
        let mut handles: Vec<String> = self.records.iter().map(|entry| entry.key().clone()).collect();
        handles.sort();
        Ok(handles)
    }
}
