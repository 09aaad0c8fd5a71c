//! Transaction handle. Wraps exactly one redb transaction, read or write,
//! and is the thing every [`crate::bucket::Bucket`] borrows from.
//!
//! Tables are never cached inside `Transaction` or `Bucket` — every
//! operation opens (or checks for) the tables it needs fresh, the way the
//! teacher's `RedbBackend` does per-call. That keeps lifetimes simple (no
//! self-referential structs) and means a plain read (`get`, `exists`,
//! querying) never has the side effect of materializing an empty bucket,
//! even when it happens to run inside a write transaction.

use redb::{ReadTransaction, ReadableTable, TableHandle, WriteTransaction};

use crate::error::{Error, Result};
use crate::tables::{self, REGISTRY_TABLE_NAME};

pub(crate) enum Inner {
    Read(ReadTransaction),
    Write(WriteTransaction),
}

/// A single redb transaction, read-only or read-write.
pub struct Transaction {
    pub(crate) inner: Inner,
}

impl Transaction {
    pub(crate) fn read(txn: ReadTransaction) -> Self {
        Self { inner: Inner::Read(txn) }
    }

    pub(crate) fn write(txn: WriteTransaction) -> Self {
        Self { inner: Inner::Write(txn) }
    }

    pub(crate) fn is_write(&self) -> bool {
        matches!(self.inner, Inner::Write(_))
    }

    /// Does a physical table by this exact name currently exist? Never
    /// creates it — safe to call from a pure read path regardless of
    /// whether this transaction happens to be a write transaction.
    pub(crate) fn table_exists(&self, name: &str) -> Result<bool> {
        match &self.inner {
            Inner::Read(r) => Ok(r.list_tables()?.any(|t| t.name() == name)),
            Inner::Write(w) => Ok(w.list_tables()?.any(|t| t.name() == name)),
        }
    }

    pub(crate) fn table_names_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let names: Vec<String> = match &self.inner {
            Inner::Read(r) => r.list_tables()?.map(|t| t.name().to_string()).collect(),
            Inner::Write(w) => w.list_tables()?.map(|t| t.name().to_string()).collect(),
        };
        Ok(names.into_iter().filter(|n| n.starts_with(prefix)).collect())
    }

    /// Access a named bucket inside this transaction.
    pub fn bucket(&self, name: impl Into<String>) -> crate::bucket::TxBucket<'_> {
        crate::bucket::TxBucket::new(self, name)
    }

    /// List every registered bucket name.
    pub fn bucket_names(&self) -> Result<Vec<String>> {
        if !self.table_exists(REGISTRY_TABLE_NAME)? {
            return Ok(Vec::new());
        }
        let names = match &self.inner {
            Inner::Read(r) => {
                let table = r.open_table(tables::table(REGISTRY_TABLE_NAME))?;
                table
                    .iter()?
                    .map(|row| row.map(|(k, _v)| String::from_utf8_lossy(k.value()).into_owned()))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            Inner::Write(w) => {
                let table = w.open_table(tables::table(REGISTRY_TABLE_NAME))?;
                table
                    .iter()?
                    .map(|row| row.map(|(k, _v)| String::from_utf8_lossy(k.value()).into_owned()))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(names)
    }

    /// Materialize a bucket's data table, index root, and registry entry if
    /// any of them are missing. Requires a write transaction.
    pub fn create_bucket_if_not_exists(&self, name: &str) -> Result<()> {
        let w = self.require_write()?;
        {
            let mut registry = w.open_table(tables::table(REGISTRY_TABLE_NAME))?;
            registry.insert(name.as_bytes(), b"e".as_slice())?;
        }
        w.open_table(tables::table(&tables::data_table_name(name)))?;
        w.open_table(tables::table(&tables::index_root_table_name(name)))?;
        Ok(())
    }

    /// Drop a bucket's data table, every property index table, its index
    /// root marker, its sequence counter, and its registry entry. Order:
    /// data first (so a reader racing a concurrent read transaction never
    /// observes an index without data), then indexes, then the registry
    /// entry last (so a crash mid-delete still shows the bucket as
    /// registered and a future open can detect and finish the cleanup).
    pub fn delete_bucket(&self, name: &str) -> Result<()> {
        let w = self.require_write()?;
        let _ = w.delete_table(tables::table(&tables::data_table_name(name)))?;
        let prop_prefix = tables::index_prop_table_prefix(name);
        let prop_tables: Vec<String> = w
            .list_tables()?
            .map(|t| t.name().to_string())
            .filter(|n| n.starts_with(&prop_prefix))
            .collect();
        for prop_table in prop_tables {
            let _ = w.delete_table(tables::table(&prop_table))?;
        }
        let _ = w.delete_table(tables::table(&tables::index_root_table_name(name)))?;
        {
            let mut seq = w.open_table(tables::table(crate::tables::SEQUENCE_TABLE_NAME))?;
            let _ = seq.remove(name.as_bytes())?;
        }
        {
            let mut registry = w.open_table(tables::table(REGISTRY_TABLE_NAME))?;
            let _ = registry.remove(name.as_bytes())?;
        }
        Ok(())
    }

    pub(crate) fn require_write(&self) -> Result<&WriteTransaction> {
        match &self.inner {
            Inner::Write(w) => Ok(w),
            Inner::Read(_) => Err(Error::Storage("operation requires a write transaction".into())),
        }
    }

    /// Commit a write transaction. A read transaction is simply dropped.
    pub fn commit(self) -> Result<()> {
        match self.inner {
            Inner::Write(w) => Ok(w.commit()?),
            Inner::Read(_) => Ok(()),
        }
    }

    /// Explicitly discard a write transaction's changes.
    pub fn rollback(self) -> Result<()> {
        match self.inner {
            Inner::Write(w) => Ok(w.abort()?),
            Inner::Read(_) => Ok(()),
        }
    }
}
