//! The redb-range-backed cursor adapter described in SPEC_FULL.md §4.3.
//!
//! redb has no persistent, stateful cursor type — `ReadableTable::range`
//! returns a fresh `DoubleEndedIterator` each call. `Cursor` bridges that to
//! the `first/last/next/prev/seek` contract the spec's external KV engine
//! assumes, by re-issuing one bounded `range` query per step, keyed off the
//! last-seen position. Every navigation call is therefore O(log n), same as
//! a real b-tree cursor seek, just without amortizing repeated next() calls
//! down to O(1); that tradeoff is accepted since redb offers nothing closer.

use std::ops::Bound;

use redb::ReadableTable;

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Position {
    BeforeStart,
    At(Vec<u8>),
    AfterEnd,
}

/// A forward/backward walker over one redb table of `&[u8] -> &[u8]`.
pub(crate) struct Cursor<T> {
    table: T,
    position: Position,
}

type Row = (Vec<u8>, Vec<u8>);

impl<T> Cursor<T>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    pub(crate) fn new(table: T) -> Self {
        Self {
            table,
            position: Position::BeforeStart,
        }
    }

    fn materialize(&mut self, item: Option<Row>, on_none: Position) -> Result<Option<Row>> {
        match item {
            Some((key, value)) => {
                self.position = Position::At(key.clone());
                Ok(Some((key, value)))
            }
            None => {
                self.position = on_none;
                Ok(None)
            }
        }
    }

    fn to_row(
        item: Option<std::result::Result<(redb::AccessGuard<'_, &'static [u8]>, redb::AccessGuard<'_, &'static [u8]>), redb::StorageError>>,
    ) -> Result<Option<Row>> {
        match item {
            Some(pair) => {
                let (k, v) = pair?;
                Ok(Some((k.value().to_vec(), v.value().to_vec())))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn first(&mut self) -> Result<Option<Row>> {
        let mut range = self.table.range::<&[u8]>(..)?;
        let item = range.next();
        let item = Self::to_row(item)?;
        drop(range);
        self.materialize(item, Position::AfterEnd)
    }

    pub(crate) fn last(&mut self) -> Result<Option<Row>> {
        let mut range = self.table.range::<&[u8]>(..)?;
        let item = range.next_back();
        let item = Self::to_row(item)?;
        drop(range);
        self.materialize(item, Position::BeforeStart)
    }

    pub(crate) fn next(&mut self) -> Result<Option<Row>> {
        match self.position.clone() {
            Position::AfterEnd => Ok(None),
            Position::BeforeStart => self.first(),
            Position::At(key) => {
                let bounds = (Bound::Excluded(key.as_slice()), Bound::Unbounded);
                let mut range = self.table.range::<&[u8]>(bounds)?;
                let item = range.next();
                let item = Self::to_row(item)?;
                drop(range);
                self.materialize(item, Position::AfterEnd)
            }
        }
    }

    pub(crate) fn prev(&mut self) -> Result<Option<Row>> {
        match self.position.clone() {
            Position::BeforeStart => Ok(None),
            Position::AfterEnd => self.last(),
            Position::At(key) => {
                let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Unbounded, Bound::Excluded(key.as_slice()));
                let mut range = self.table.range::<&[u8]>(bounds)?;
                let item = range.next_back();
                let item = Self::to_row(item)?;
                drop(range);
                self.materialize(item, Position::BeforeStart)
            }
        }
    }

    /// Move to the first key greater than or equal to `key` (bbolt-style
    /// `Seek`). `None` means `key` is greater than every key in the table,
    /// and the cursor now sits past the end.
    pub(crate) fn seek(&mut self, key: &[u8]) -> Result<Option<Row>> {
        let mut range = self.table.range::<&[u8]>(key..)?;
        let item = range.next();
        let item = Self::to_row(item)?;
        drop(range);
        self.materialize(item, Position::AfterEnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::{Database, ReadableDatabase, TableDefinition};
    use tempfile::NamedTempFile;

    const T: TableDefinition<&[u8], &[u8]> = TableDefinition::new("t");

    fn populate(db: &Database, rows: &[(&[u8], &[u8])]) {
        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(T).unwrap();
            for (k, v) in rows {
                table.insert(*k, *v).unwrap();
            }
        }
        txn.commit().unwrap();
    }

    #[test]
    fn first_last_next_prev_walk_in_order() {
        let file = NamedTempFile::new().unwrap();
        let db = Database::create(file.path()).unwrap();
        populate(
            &db,
            &[
                (b"a".as_slice(), b"1".as_slice()),
                (b"b".as_slice(), b"2".as_slice()),
                (b"c".as_slice(), b"3".as_slice()),
            ],
        );

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(T).unwrap();
        let mut cursor = Cursor::new(table);

        assert_eq!(cursor.first().unwrap(), Some((b"a".to_vec(), b"1".to_vec())));
        assert_eq!(cursor.next().unwrap(), Some((b"b".to_vec(), b"2".to_vec())));
        assert_eq!(cursor.next().unwrap(), Some((b"c".to_vec(), b"3".to_vec())));
        assert_eq!(cursor.next().unwrap(), None);

        assert_eq!(cursor.last().unwrap(), Some((b"c".to_vec(), b"3".to_vec())));
        assert_eq!(cursor.prev().unwrap(), Some((b"b".to_vec(), b"2".to_vec())));
        assert_eq!(cursor.prev().unwrap(), Some((b"a".to_vec(), b"1".to_vec())));
        assert_eq!(cursor.prev().unwrap(), None);
    }

    #[test]
    fn seek_lands_on_first_key_gte() {
        let file = NamedTempFile::new().unwrap();
        let db = Database::create(file.path()).unwrap();
        populate(
            &db,
            &[
                (b"a".as_slice(), b"1".as_slice()),
                (b"c".as_slice(), b"3".as_slice()),
            ],
        );

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(T).unwrap();
        let mut cursor = Cursor::new(table);

        assert_eq!(cursor.seek(b"b").unwrap(), Some((b"c".to_vec(), b"3".to_vec())));
        assert_eq!(cursor.seek(b"z").unwrap(), None);
        // past the end: prev() from AfterEnd behaves like last()
        assert_eq!(cursor.prev().unwrap(), Some((b"c".to_vec(), b"3".to_vec())));
    }

    #[test]
    fn empty_table_yields_none_everywhere() {
        let file = NamedTempFile::new().unwrap();
        let db = Database::create(file.path()).unwrap();
        populate(&db, &[]);

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(T).unwrap();
        let mut cursor = Cursor::new(table);
        assert_eq!(cursor.first().unwrap(), None);
        assert_eq!(cursor.last().unwrap(), None);
        assert_eq!(cursor.seek(b"x").unwrap(), None);
    }
}
