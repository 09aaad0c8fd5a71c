//! The public, convenience-transaction bucket handle: `get`/`put`/`delete`/
//! `query` each spawn their own transaction of the right kind when called
//! outside one you opened yourself (spec §4.6) — reads run read-only,
//! mutations escalate to read-write.

use crate::base_bucket::BaseBucket;
use crate::error::Result;
use crate::filter;
use crate::query::{Item, Query};
use crate::store::Store;
use crate::tx::Transaction;

/// A named document bucket inside a [`Store`].
pub struct Bucket<'a> {
    store: &'a Store,
    name: String,
}

impl<'a> Bucket<'a> {
    pub fn new(store: &'a Store, name: impl Into<String>) -> Self {
        Self { store, name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch the raw JSON bytes stored under `key`, or `None` if absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.view(|txn| BaseBucket::new(txn, self.name.clone()).get(key))
    }

    /// Whether this bucket itself has been materialized (its data and
    /// index-root namespaces exist). Checking for a particular document is
    /// `get(key).is_some()`.
    pub fn exists(&self) -> Result<bool> {
        self.store.view(|txn| BaseBucket::new(txn, self.name.clone()).exists())
    }

    /// Parse `json_bytes` as a JSON object, run the index-maintenance
    /// protocol, and store it under `key`, in one write transaction.
    /// Materializes the bucket first if it doesn't exist yet (spec §4.6).
    pub fn put(&self, key: &[u8], json_bytes: &[u8]) -> Result<()> {
        self.store.update(|txn| {
            txn.create_bucket_if_not_exists(&self.name)?;
            BaseBucket::new(txn, self.name.clone()).put(key, json_bytes)
        })
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.store.update(|txn| BaseBucket::new(txn, self.name.clone()).delete(key))
    }

    /// Allocate the next value of this bucket's monotonic counter.
    /// Materializes the bucket first if it doesn't exist yet (spec §7).
    pub fn next_sequence(&self) -> Result<u64> {
        self.store.update(|txn| {
            txn.create_bucket_if_not_exists(&self.name)?;
            BaseBucket::new(txn, self.name.clone()).next_sequence()
        })
    }

    /// Run `query` against this bucket's current contents.
    pub fn query(&self, query: &Query) -> Result<Vec<Item>> {
        self.store.view(|txn| filter::execute(&BaseBucket::new(txn, self.name.clone()), query))
    }

    /// The set of properties this bucket currently has a secondary index
    /// for.
    pub fn indexed_properties(&self) -> Result<Vec<String>> {
        self.store.view(|txn| BaseBucket::new(txn, self.name.clone()).indexed_properties())
    }
}

/// Same surface as [`Bucket`], but operating inside a transaction the
/// caller already holds open, so several operations can be made atomic
/// together. Read methods work against either transaction kind; mutating
/// methods require a write transaction (`Error::Storage` otherwise).
pub struct TxBucket<'a> {
    txn: &'a Transaction,
    name: String,
}

impl<'a> TxBucket<'a> {
    pub fn new(txn: &'a Transaction, name: impl Into<String>) -> Self {
        Self { txn, name: name.into() }
    }

    fn base(&self) -> BaseBucket<'a> {
        BaseBucket::new(self.txn, self.name.clone())
    }

    pub fn exists(&self) -> Result<bool> {
        self.base().exists()
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.base().get(key)
    }

    pub fn put(&self, key: &[u8], json_bytes: &[u8]) -> Result<()> {
        self.txn.create_bucket_if_not_exists(&self.name)?;
        self.base().put(key, json_bytes)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.base().delete(key)
    }

    pub fn next_sequence(&self) -> Result<u64> {
        self.txn.create_bucket_if_not_exists(&self.name)?;
        self.base().next_sequence()
    }

    pub fn query(&self, query: &Query) -> Result<Vec<Item>> {
        filter::execute(&self.base(), query)
    }

    pub fn indexed_properties(&self) -> Result<Vec<String>> {
        self.base().indexed_properties()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::StoreOptions;
    use crate::query::{Direction, Query};
    use crate::filter::Filter;
    use tempfile::NamedTempFile;

    #[test]
    fn bucket_auto_transaction_put_get_query() {
        let file = NamedTempFile::new().unwrap();
        let store = Store::open(file.path(), StoreOptions::default()).unwrap();
        store.update(|txn| txn.create_bucket_if_not_exists("users")).unwrap();

        let bucket = Bucket::new(&store, "users");
        bucket.put(b"u1", br#"{"name":"alice"}"#).unwrap();
        assert!(bucket.exists().unwrap());
        assert!(bucket.get(b"u1").unwrap().is_some());

        let results = bucket
            .query(&Query::new().with_filter(Filter::OrderBy { dir: Direction::Asc }))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, b"u1".to_vec());
    }

    #[test]
    fn tx_bucket_batches_multiple_writes_atomically() {
        let file = NamedTempFile::new().unwrap();
        let store = Store::open(file.path(), StoreOptions::default()).unwrap();
        store
            .update(|txn| {
                txn.create_bucket_if_not_exists("users")?;
                let bucket = TxBucket::new(txn, "users");
                bucket.put(b"u1", br#"{"name":"a"}"#)?;
                bucket.put(b"u2", br#"{"name":"b"}"#)?;
                Ok(())
            })
            .unwrap();

        let bucket = Bucket::new(&store, "users");
        assert!(bucket.exists().unwrap());
        assert!(bucket.get(b"u1").unwrap().is_some());
        assert!(bucket.get(b"u2").unwrap().is_some());
    }
}
