//! The top-level handle onto one redb database file.
//!
//! Mirrors the teacher's `RedbBackend::open` shape (validate options, open
//! or create the underlying engine, ensure its own bookkeeping tables
//! exist) generalized from a single fixed-purpose table to this crate's
//! bucket registry and sequence-counter tables.

use std::path::Path;

use redb::{Database, ReadableDatabase};
use tracing::info;

use crate::error::{Error, Result};
use crate::options::StoreOptions;
use crate::tables::{self, REGISTRY_TABLE_NAME, SEQUENCE_TABLE_NAME};
use crate::tx::Transaction;

/// A single-file, transactional, automatically-indexed document store.
#[derive(Debug)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        if options.read_only && !path.exists() {
            return Err(Error::ReadOnlyRequiresExistingFile);
        }

        let db = if options.read_only {
            Database::open(path)?
        } else {
            Database::create(path)?
        };

        let store = Self { db };
        if !options.read_only {
            store.ensure_system_tables()?;
        }
        info!(path = %path.display(), read_only = options.read_only, "store opened");
        Ok(store)
    }

    fn ensure_system_tables(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.open_table(tables::table(REGISTRY_TABLE_NAME))?;
        txn.open_table(tables::table(SEQUENCE_TABLE_NAME))?;
        txn.commit()?;
        Ok(())
    }

    /// Begin a new transaction. `writable = false` opens a read transaction;
    /// `true` opens a read-write transaction.
    pub fn begin(&self, writable: bool) -> Result<Transaction> {
        if writable {
            Ok(Transaction::write(self.db.begin_write()?))
        } else {
            Ok(Transaction::read(self.db.begin_read()?))
        }
    }

    /// Run `f` inside a read transaction. The transaction is always dropped
    /// afterward (reads never need an explicit commit).
    pub fn view<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let txn = self.begin(false)?;
        f(&txn)
    }

    /// Run `f` inside a read-write transaction, committing on success and
    /// rolling back on error.
    pub fn update<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let txn = self.begin(true)?;
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                let _ = txn.rollback();
                Err(e)
            }
        }
    }
}
