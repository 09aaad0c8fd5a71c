//! Secondary-index traversal: walking one property's index table and
//! resolving landed rows back to primary keys / stored documents.
//!
//! An [`IndexCursor`] walks encoded index keys (see `index_key.rs`) in the
//! same order the underlying table stores them. Each landed row is exposed
//! as an [`Index`], which knows how to pull the referenced primary key back
//! out of the data table.

use crate::cursor::Cursor;
use crate::error::Result;
use crate::index_key;
use crate::value::IndexedValue;
use redb::ReadableTable;

/// One landed row of a secondary index: the encoded key plus the primary
/// key it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    encoded_key: Vec<u8>,
    primary_key: Vec<u8>,
}

impl Index {
    fn from_row(key: Vec<u8>) -> Result<Self> {
        let sep = find_key_value_boundary(&key)?;
        let primary_key = key[sep..].to_vec();
        Ok(Self {
            encoded_key: key,
            primary_key,
        })
    }

    /// The primary key this index row points at.
    pub fn primary_key(&self) -> &[u8] {
        &self.primary_key
    }

    /// The on-disk type tag of the indexed value.
    pub fn value_type(&self) -> Result<u8> {
        index_key::tag_of(&self.encoded_key)
    }

    /// The raw (possibly truncated) value bytes this row was indexed under.
    pub fn value_bytes(&self) -> Result<Vec<u8>> {
        index_key::value_bytes_of(&self.encoded_key)
    }
}

/// Locate the `00 FF` separator that divides value-bytes from primary key
/// inside a full encoded index row. Delegates to the tag-aware extractor so
/// the boundary is computed the same way regardless of value type.
fn find_key_value_boundary(key: &[u8]) -> Result<usize> {
    let value_bytes = index_key::value_bytes_of(key)?;
    Ok(1 + value_bytes.len() + 2)
}

pub(crate) struct IndexCursor<T> {
    cursor: Option<Cursor<T>>,
}

impl<T> IndexCursor<T>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    /// `table` is `None` when the property has never been indexed (its
    /// table doesn't exist yet); every navigation then yields `None`.
    pub(crate) fn new(table: Option<T>) -> Self {
        Self {
            cursor: table.map(Cursor::new),
        }
    }

    fn row_to_index(row: Option<(Vec<u8>, Vec<u8>)>) -> Result<Option<Index>> {
        match row {
            Some((key, _value)) => Ok(Some(Index::from_row(key)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn first(&mut self) -> Result<Option<Index>> {
        match &mut self.cursor {
            Some(c) => Self::row_to_index(c.first()?),
            None => Ok(None),
        }
    }

    pub(crate) fn last(&mut self) -> Result<Option<Index>> {
        match &mut self.cursor {
            Some(c) => Self::row_to_index(c.last()?),
            None => Ok(None),
        }
    }

    pub(crate) fn next(&mut self) -> Result<Option<Index>> {
        match &mut self.cursor {
            Some(c) => Self::row_to_index(c.next()?),
            None => Ok(None),
        }
    }

    pub(crate) fn prev(&mut self) -> Result<Option<Index>> {
        match &mut self.cursor {
            Some(c) => Self::row_to_index(c.prev()?),
            None => Ok(None),
        }
    }

    /// Seek to the first row whose value equals or extends `value`,
    /// ascending. Rejects a landed row whose type tag differs from
    /// `value`'s (a different-typed value that happens to sort just after
    /// the seek target).
    pub(crate) fn seek_first(&mut self, value: &IndexedValue) -> Result<Option<Index>> {
        let cursor = match &mut self.cursor {
            Some(c) => c,
            None => return Ok(None),
        };
        let target = match index_key::seek_prefix_ascending(value) {
            Some(t) => t,
            None => return Ok(None),
        };
        let row = cursor.seek(&target)?;
        let idx = Self::row_to_index(row)?;
        Ok(idx.filter(|i| i.value_type().ok() == Some(value.tag())))
    }

    /// Seek to the last row whose value equals or extends `value`,
    /// descending: lands past every matching row, then steps one `prev()`.
    pub(crate) fn seek_last(&mut self, value: &IndexedValue) -> Result<Option<Index>> {
        let cursor = match &mut self.cursor {
            Some(c) => c,
            None => return Ok(None),
        };
        let target = match index_key::seek_prefix_descending(value) {
            Some(t) => t,
            None => return Ok(None),
        };
        cursor.seek(&target)?;
        let row = cursor.prev()?;
        let idx = Self::row_to_index(row)?;
        Ok(idx.filter(|i| i.value_type().ok() == Some(value.tag())))
    }

    /// Point lookup: does `primary_key` have an index row for exactly
    /// `value`? Seeks to the ascending prefix and checks the full encoded
    /// key for equality against what this `(value, primary_key)` pair would
    /// itself encode to, guarding against a longer value's row sorting at
    /// the same seek target (e.g. value `"ab"` vs stored value `"ab\xffc"`).
    pub(crate) fn get(&mut self, value: &IndexedValue, primary_key: &[u8]) -> Result<Option<Index>> {
        let cursor = match &mut self.cursor {
            Some(c) => c,
            None => return Ok(None),
        };
        let expected = match index_key::encode_index_key(value, primary_key) {
            Some(k) => k,
            None => return Ok(None),
        };
        let target = match index_key::seek_prefix_ascending(value) {
            Some(t) => t,
            None => return Ok(None),
        };
        match cursor.seek(&target)? {
            Some((key, _)) if key == expected => Ok(Some(Index::from_row(key)?)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::IndexedValue;
    use redb::{Database, ReadableDatabase, TableDefinition};
    use tempfile::NamedTempFile;

    const T: TableDefinition<&[u8], &[u8]> = TableDefinition::new("t");

    fn open_populated(rows: &[(Vec<u8>, Vec<u8>)]) -> (NamedTempFile, Database) {
        let file = NamedTempFile::new().unwrap();
        let db = Database::create(file.path()).unwrap();
        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(T).unwrap();
            for (k, v) in rows {
                table.insert(k.as_slice(), v.as_slice()).unwrap();
            }
        }
        txn.commit().unwrap();
        (file, db)
    }

    #[test]
    fn walks_rows_in_key_order_and_resolves_primary_key() {
        let a = index_key::encode_index_key(&IndexedValue::String("alice".into()), b"u1").unwrap();
        let b = index_key::encode_index_key(&IndexedValue::String("bob".into()), b"u2").unwrap();
        let (_file, db) = open_populated(&[(a.clone(), vec![]), (b.clone(), vec![])]);

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(T).unwrap();
        let mut cursor = IndexCursor::new(Some(table));

        let first = cursor.first().unwrap().unwrap();
        assert_eq!(first.primary_key(), b"u1");
        assert_eq!(first.value_bytes().unwrap(), b"alice".to_vec());

        let second = cursor.next().unwrap().unwrap();
        assert_eq!(second.primary_key(), b"u2");
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn seek_first_rejects_mismatched_type_tag() {
        // Only a Float64 row exists; seeking for a String at the same raw
        // prefix position must not spuriously match.
        let row = index_key::encode_index_key(&IndexedValue::Float64(1.0), b"k").unwrap();
        let (_file, db) = open_populated(&[(row, vec![])]);
        let txn = db.begin_read().unwrap();
        let table = txn.open_table(T).unwrap();
        let mut cursor = IndexCursor::new(Some(table));
        assert!(cursor.seek_first(&IndexedValue::String("x".into())).unwrap().is_none());
    }

    #[test]
    fn seek_last_lands_on_greatest_matching_row() {
        let a = index_key::encode_index_key(&IndexedValue::String("a".into()), b"1").unwrap();
        let a2 = index_key::encode_index_key(&IndexedValue::String("a".into()), b"2").unwrap();
        let b = index_key::encode_index_key(&IndexedValue::String("b".into()), b"3").unwrap();
        let (_file, db) = open_populated(&[(a, vec![]), (a2, vec![]), (b, vec![])]);
        let txn = db.begin_read().unwrap();
        let table = txn.open_table(T).unwrap();
        let mut cursor = IndexCursor::new(Some(table));
        let last = cursor.seek_last(&IndexedValue::String("a".into())).unwrap().unwrap();
        assert_eq!(last.primary_key(), b"2");
    }

    #[test]
    fn get_distinguishes_prefix_collision() {
        let short = index_key::encode_index_key(&IndexedValue::String("ab".into()), b"short").unwrap();
        let long = index_key::encode_index_key(&IndexedValue::String("abc".into()), b"long").unwrap();
        let (_file, db) = open_populated(&[(short, vec![]), (long, vec![])]);
        let txn = db.begin_read().unwrap();
        let table = txn.open_table(T).unwrap();
        let mut cursor = IndexCursor::new(Some(table));
        let hit = cursor.get(&IndexedValue::String("ab".into()), b"short").unwrap();
        assert!(hit.is_some());
        let miss = cursor.get(&IndexedValue::String("ab".into()), b"long").unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn missing_table_yields_none_everywhere() {
        let mut cursor: IndexCursor<redb::ReadOnlyTable<&'static [u8], &'static [u8]>> = IndexCursor::new(None);
        assert!(cursor.first().unwrap().is_none());
        assert!(cursor.seek_first(&IndexedValue::Nil).unwrap().is_none());
    }
}
