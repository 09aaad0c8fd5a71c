//! The base bucket: raw get/put/delete plus the index-maintenance protocol
//! that keeps every property's secondary index in sync with the data table,
//! all inside one ambient transaction.
//!
//! Every method here opens the tables it needs itself, keyed off
//! [`Transaction`]'s read/write split, rather than caching table handles —
//! see the module doc on `tx.rs`.

use redb::{ReadOnlyTable, ReadableTable, ReadableTableMetadata, Table};
use tracing::{debug, trace};

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::index_cursor::{Index, IndexCursor};
use crate::index_key;
use crate::tables::{self, SEQUENCE_TABLE_NAME};
use crate::tx::{Inner, Transaction};
use crate::util::{bytes_to_u64, u64_to_bytes};
use crate::value::IndexedValue;

type BytesTable<'a> = Table<'a, &'static [u8], &'static [u8]>;
type BytesReadTable = ReadOnlyTable<&'static [u8], &'static [u8]>;

pub(crate) struct BaseBucket<'a> {
    tx: &'a Transaction,
    name: String,
}

impl<'a> BaseBucket<'a> {
    pub(crate) fn new(tx: &'a Transaction, name: impl Into<String>) -> Self {
        Self { tx, name: name.into() }
    }

    fn data_table_name(&self) -> String {
        tables::data_table_name(&self.name)
    }

    fn index_root_table_name(&self) -> String {
        tables::index_root_table_name(&self.name)
    }

    /// Checks the symmetric-namespace invariant (spec §3): a bucket's data
    /// table and index-root marker must exist together or not at all.
    pub(crate) fn exists(&self) -> Result<bool> {
        let data = self.tx.table_exists(&self.data_table_name())?;
        let index = self.tx.table_exists(&self.index_root_table_name())?;
        if data != index {
            return Err(Error::SchemaMismatch(format!(
                "bucket {:?} has a data namespace without a matching index namespace (or vice versa)",
                self.name
            )));
        }
        Ok(data)
    }

    pub(crate) fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if !self.tx.table_exists(&self.data_table_name())? {
            return Ok(None);
        }
        match &self.tx.inner {
            Inner::Read(r) => {
                let table = r.open_table(tables::table(&self.data_table_name()))?;
                Ok(table_get(&table, key)?)
            }
            Inner::Write(w) => {
                let table = w.open_table(tables::table(&self.data_table_name()))?;
                Ok(table_get(&table, key)?)
            }
        }
    }

    pub(crate) fn put(&self, key: &[u8], json_bytes: &[u8]) -> Result<()> {
        let parsed: serde_json::Value = serde_json::from_slice(json_bytes)?;
        if !parsed.is_object() {
            return Err(Error::NotAJsonObject);
        }
        let w = self.tx.require_write()?;

        let old_value = {
            let table = w.open_table(tables::table(&self.data_table_name()))?;
            table_get(&table, key)?
        }
        .and_then(|b| serde_json::from_slice::<serde_json::Value>(&b).ok());

        refresh_index(w, &self.name, key, old_value.as_ref(), Some(&parsed))?;

        let canonical = serde_json::to_vec(&parsed)?;
        let mut table = w.open_table(tables::table(&self.data_table_name()))?;
        table.insert(key, canonical.as_slice())?;
        debug!(bucket = %self.name, "put committed");
        Ok(())
    }

    pub(crate) fn delete(&self, key: &[u8]) -> Result<()> {
        if !self.tx.table_exists(&self.data_table_name())? {
            return Ok(());
        }
        let w = self.tx.require_write()?;

        let old_value = {
            let table = w.open_table(tables::table(&self.data_table_name()))?;
            table_get(&table, key)?
        }
        .and_then(|b| serde_json::from_slice::<serde_json::Value>(&b).ok());

        refresh_index(w, &self.name, key, old_value.as_ref(), None)?;

        let mut table = w.open_table(tables::table(&self.data_table_name()))?;
        table.remove(key)?;
        debug!(bucket = %self.name, "delete committed");
        Ok(())
    }

    pub(crate) fn next_sequence(&self) -> Result<u64> {
        let w = self.tx.require_write()?;
        let mut seq_table = w.open_table(tables::table(SEQUENCE_TABLE_NAME))?;
        let current = seq_table
            .get(self.name.as_bytes())?
            .map(|g| bytes_to_u64(g.value()))
            .unwrap_or(0);
        let next = current + 1;
        seq_table.insert(self.name.as_bytes(), u64_to_bytes(next).as_slice())?;
        Ok(next)
    }

    pub(crate) fn cursor(&self) -> Result<BucketCursor<'a>> {
        let name = self.data_table_name();
        if !self.tx.table_exists(&name)? {
            return Ok(BucketCursor::Empty);
        }
        match &self.tx.inner {
            Inner::Read(r) => Ok(BucketCursor::Read(Cursor::new(r.open_table(tables::table(&name))?))),
            Inner::Write(w) => Ok(BucketCursor::Write(Cursor::new(w.open_table(tables::table(&name))?))),
        }
    }

    pub(crate) fn index_cursor(&self, property: &str) -> Result<BucketIndexCursor<'a>> {
        let name = tables::index_prop_table_name(&self.name, property);
        let present = self.tx.table_exists(&name)?;
        match &self.tx.inner {
            Inner::Read(r) => {
                let table = if present { Some(r.open_table(tables::table(&name))?) } else { None };
                Ok(BucketIndexCursor::Read(IndexCursor::new(table)))
            }
            Inner::Write(w) => {
                let table = if present { Some(w.open_table(tables::table(&name))?) } else { None };
                Ok(BucketIndexCursor::Write(IndexCursor::new(table)))
            }
        }
    }

    pub(crate) fn indexed_properties(&self) -> Result<Vec<String>> {
        let prefix = tables::index_prop_table_prefix(&self.name);
        let names = self.tx.table_names_with_prefix(&prefix)?;
        Ok(names.into_iter().map(|n| n[prefix.len()..].to_string()).collect())
    }
}

fn table_get<T: redb::ReadableTable<&'static [u8], &'static [u8]>>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(table.get(key)?.map(|g| g.value().to_vec()))
}

/// Retract `old`'s index rows, insert `new`'s, then drop any property table
/// left empty by the retraction. `new = None` models a delete.
///
/// Runs inside the caller's ambient write transaction, so a crash between
/// these steps is invisible: either the whole protocol lands or none of it
/// does.
fn refresh_index(
    w: &redb::WriteTransaction,
    bucket: &str,
    primary_key: &[u8],
    old: Option<&serde_json::Value>,
    new: Option<&serde_json::Value>,
) -> Result<()> {
    let mut retracted_tables: Vec<String> = Vec::new();

    if let Some(old_obj) = old.and_then(|v| v.as_object()) {
        for (prop, value) in old_obj {
            if prop.starts_with('_') {
                continue;
            }
            let indexed = IndexedValue::from_json(value);
            if let Some(key) = index_key::encode_index_key(&indexed, primary_key) {
                let table_name = tables::index_prop_table_name(bucket, prop);
                let mut table = w.open_table(tables::table(&table_name))?;
                table.remove(key.as_slice())?;
                retracted_tables.push(table_name);
                trace!(bucket, property = %prop, "retracted index row");
            }
        }
    }

    if let Some(new_obj) = new.and_then(|v| v.as_object()) {
        for (prop, value) in new_obj {
            if prop.starts_with('_') {
                continue;
            }
            let indexed = IndexedValue::from_json(value);
            if let Some(key) = index_key::encode_index_key(&indexed, primary_key) {
                let table_name = tables::index_prop_table_name(bucket, prop);
                let mut table = w.open_table(tables::table(&table_name))?;
                table.insert(key.as_slice(), [].as_slice())?;
                trace!(bucket, property = %prop, "inserted index row");
            }
        }
    }

    for table_name in retracted_tables {
        let is_empty = {
            let table = w.open_table(tables::table(&table_name))?;
            table.is_empty()?
        };
        if is_empty {
            w.delete_table(tables::table(&table_name))?;
            debug!(table = %table_name, "garbage collected empty property index");
        }
    }

    Ok(())
}

/// Either side of the primary-key cursor, unified so callers (query
/// execution) don't need to know which transaction kind they're in.
pub(crate) enum BucketCursor<'a> {
    Read(Cursor<BytesReadTable>),
    Write(Cursor<BytesTable<'a>>),
    Empty,
}

impl<'a> BucketCursor<'a> {
    pub(crate) fn first(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            BucketCursor::Read(c) => c.first(),
            BucketCursor::Write(c) => c.first(),
            BucketCursor::Empty => Ok(None),
        }
    }

    pub(crate) fn last(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            BucketCursor::Read(c) => c.last(),
            BucketCursor::Write(c) => c.last(),
            BucketCursor::Empty => Ok(None),
        }
    }

    pub(crate) fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            BucketCursor::Read(c) => c.next(),
            BucketCursor::Write(c) => c.next(),
            BucketCursor::Empty => Ok(None),
        }
    }

    pub(crate) fn prev(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            BucketCursor::Read(c) => c.prev(),
            BucketCursor::Write(c) => c.prev(),
            BucketCursor::Empty => Ok(None),
        }
    }

    pub(crate) fn seek(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            BucketCursor::Read(c) => c.seek(key),
            BucketCursor::Write(c) => c.seek(key),
            BucketCursor::Empty => Ok(None),
        }
    }
}

/// Either side of a property's secondary-index cursor, unified the same way
/// as [`BucketCursor`].
pub(crate) enum BucketIndexCursor<'a> {
    Read(IndexCursor<BytesReadTable>),
    Write(IndexCursor<BytesTable<'a>>),
}

impl<'a> BucketIndexCursor<'a> {
    pub(crate) fn first(&mut self) -> Result<Option<Index>> {
        match self {
            BucketIndexCursor::Read(c) => c.first(),
            BucketIndexCursor::Write(c) => c.first(),
        }
    }

    pub(crate) fn last(&mut self) -> Result<Option<Index>> {
        match self {
            BucketIndexCursor::Read(c) => c.last(),
            BucketIndexCursor::Write(c) => c.last(),
        }
    }

    pub(crate) fn next(&mut self) -> Result<Option<Index>> {
        match self {
            BucketIndexCursor::Read(c) => c.next(),
            BucketIndexCursor::Write(c) => c.next(),
        }
    }

    pub(crate) fn prev(&mut self) -> Result<Option<Index>> {
        match self {
            BucketIndexCursor::Read(c) => c.prev(),
            BucketIndexCursor::Write(c) => c.prev(),
        }
    }

    pub(crate) fn seek_first(&mut self, value: &IndexedValue) -> Result<Option<Index>> {
        match self {
            BucketIndexCursor::Read(c) => c.seek_first(value),
            BucketIndexCursor::Write(c) => c.seek_first(value),
        }
    }

    pub(crate) fn seek_last(&mut self, value: &IndexedValue) -> Result<Option<Index>> {
        match self {
            BucketIndexCursor::Read(c) => c.seek_last(value),
            BucketIndexCursor::Write(c) => c.seek_last(value),
        }
    }
}
