//! In-process document store used by tests and simulations.

use std::collections::BTreeMap;

use super::{DocumentStore, StoreError};

/// Document store kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: BTreeMap<String, String>,
    writes: u64,
    /// Documents as they were at `begin_write`, restored on rollback.
    saved: Option<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Number of mutating calls so far.
    #[must_use]
    pub const fn writes(&self) -> u64 {
        self.writes
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.docs.get(key).cloned())
    }

    fn put(&mut self, key: &str, body: &str) -> Result<(), StoreError> {
        self.docs.insert(key.to_string(), body.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.docs.remove(key).is_some() {
            self.writes += 1;
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .docs
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.docs.clear();
        self.writes += 1;
        Ok(())
    }

    fn begin_write(&mut self) -> Result<(), StoreError> {
        self.saved = Some(self.docs.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.saved = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(saved) = self.saved.take() {
            self.docs = saved;
        }
        Ok(())
    }

    fn change_counter(&self) -> Result<u64, StoreError> {
        Ok(self.writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_scan_is_ordered_and_bounded() -> Result<(), StoreError> {
        let mut store = MemoryStore::new();
        store.put("sst_date_2024-01-11", "{}")?;
        store.put("sst_date_2024-01-10", "{}")?;
        store.put("sst_forward_v1", "{}")?;
        store.put("sst_ranges_v1", "[]")?;

        assert_eq!(
            store.keys_with_prefix("sst_date_")?,
            vec!["sst_date_2024-01-10", "sst_date_2024-01-11"]
        );
        Ok(())
    }

    #[test]
    fn put_replaces_whole_document() -> Result<(), StoreError> {
        let mut store = MemoryStore::new();
        store.put("k", r#"{"a":1}"#)?;
        store.put("k", r#"{"b":2}"#)?;
        assert_eq!(store.get("k")?.as_deref(), Some(r#"{"b":2}"#));
        assert_eq!(store.change_counter()?, 2);
        Ok(())
    }
}
