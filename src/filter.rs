//! The sealed set of query filters and their execution against a bucket.
//!
//! Every variant shares one offset/limit discipline: a running counter is
//! incremented per candidate row; rows are only emitted once the counter
//! reaches `offset`, and the walk stops as soon as `limit != 0` and the
//! emitted count reaches `limit`. Candidates are anything accepted by the
//! filter's own predicate, counted whether or not they fall inside the
//! window — matching spec §4.8's offset/limit semantics.

use crate::base_bucket::BaseBucket;
use crate::error::Result;
use crate::index_key;
use crate::query::{Direction, Item, Query};
use crate::value::{IndexedValue, ToIndexedValue};

/// The fixed set of ways a query can order or restrict a bucket's rows.
/// Sealed: no external crate can add a new variant.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Filter {
    /// Walk the bucket's primary key order, no restriction.
    OrderBy { dir: Direction },
    /// Only keys beginning with `prefix`, in primary key order.
    KeyPrefix { prefix: Vec<u8>, dir: Direction },
    /// Only keys within `[min, max]` (either bound optional), in primary
    /// key order.
    KeyRange {
        min: Option<Vec<u8>>,
        max: Option<Vec<u8>>,
        dir: Direction,
    },
    /// Only documents whose `property` equals `value` exactly, ordered by
    /// that property's index.
    PropValueMatch {
        property: String,
        value: IndexedValue,
        dir: Direction,
    },
    /// Only documents whose `property` (a string) starts with `prefix`,
    /// ordered by that property's index.
    PropValuePrefix {
        property: String,
        prefix: String,
        dir: Direction,
    },
    /// Only documents whose `property` falls within `[min, max]` (either
    /// bound optional), ordered by that property's index. `min`/`max` must
    /// share the same type tag; a mismatch yields an empty result, since
    /// the index has no notion of cross-type ordering.
    PropValueRange {
        property: String,
        min: Option<IndexedValue>,
        max: Option<IndexedValue>,
        dir: Direction,
    },
}

impl Filter {
    /// Shorthand for [`Filter::PropValueMatch`] that accepts any
    /// [`ToIndexedValue`] input (bools, strings, numbers, raw JSON values).
    pub fn prop_equals(property: impl Into<String>, value: impl ToIndexedValue, dir: Direction) -> Self {
        Filter::PropValueMatch {
            property: property.into(),
            value: value.to_indexed_value(),
            dir,
        }
    }

    /// Shorthand for [`Filter::PropValueRange`] that accepts any
    /// [`ToIndexedValue`] bounds.
    pub fn prop_between(
        property: impl Into<String>,
        min: Option<impl ToIndexedValue>,
        max: Option<impl ToIndexedValue>,
        dir: Direction,
    ) -> Self {
        Filter::PropValueRange {
            property: property.into(),
            min: min.map(|v| v.to_indexed_value()),
            max: max.map(|v| v.to_indexed_value()),
            dir,
        }
    }
}

struct Window {
    offset: u64,
    limit: u64,
    counter: u64,
}

impl Window {
    fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit, counter: 0 }
    }

    /// Returns `true` if the walk should keep going after this candidate.
    /// `emit` tells the caller whether to push the candidate into results.
    fn admit(&mut self) -> (bool, bool) {
        let emit = self.counter >= self.offset;
        self.counter += 1;
        let done = self.limit != 0 && self.counter >= self.offset + self.limit;
        (emit, !done)
    }
}

pub(crate) fn execute(bucket: &BaseBucket, query: &Query) -> Result<Vec<Item>> {
    let mut out = Vec::new();
    let mut window = Window::new(query.offset, query.limit);
    match &query.filter {
        Filter::OrderBy { dir } => order_by(bucket, *dir, &mut window, &mut out)?,
        Filter::KeyPrefix { prefix, dir } => key_prefix(bucket, prefix, *dir, &mut window, &mut out)?,
        Filter::KeyRange { min, max, dir } => key_range(bucket, min.as_deref(), max.as_deref(), *dir, &mut window, &mut out)?,
        Filter::PropValueMatch { property, value, dir } => prop_value_match(bucket, property, value, *dir, &mut window, &mut out)?,
        Filter::PropValuePrefix { property, prefix, dir } => {
            prop_value_prefix(bucket, property, prefix, *dir, &mut window, &mut out)?
        }
        Filter::PropValueRange { property, min, max, dir } => {
            prop_value_range(bucket, property, min.as_ref(), max.as_ref(), *dir, &mut window, &mut out)?
        }
    }
    Ok(out)
}

fn push_item(key: &[u8], value: Vec<u8>, window: &mut Window, out: &mut Vec<Item>) -> bool {
    let (emit, keep_going) = window.admit();
    if emit {
        out.push(Item { key: key.to_vec(), value });
    }
    keep_going
}

fn order_by(bucket: &BaseBucket, dir: Direction, window: &mut Window, out: &mut Vec<Item>) -> Result<()> {
    let mut cursor = bucket.cursor()?;
    let mut row = match dir {
        Direction::Asc => cursor.first()?,
        Direction::Desc => cursor.last()?,
    };
    while let Some((key, value)) = row {
        if !push_item(&key, value, window, out) {
            break;
        }
        row = match dir {
            Direction::Asc => cursor.next()?,
            Direction::Desc => cursor.prev()?,
        };
    }
    Ok(())
}

/// Smallest key strictly greater than `key`.
fn successor(key: &[u8]) -> Vec<u8> {
    let mut v = key.to_vec();
    v.push(0x00);
    v
}

/// Smallest key greater than every key sharing `prefix`, or `None` if
/// `prefix` is empty or made entirely of `0xFF` bytes (no finite bound —
/// the prefix family runs to the end of the keyspace).
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    loop {
        match end.pop() {
            None => return None,
            Some(b) if b != 0xFF => {
                end.push(b + 1);
                return Some(end);
            }
            Some(_) => continue,
        }
    }
}

fn key_prefix(bucket: &BaseBucket, prefix: &[u8], dir: Direction, window: &mut Window, out: &mut Vec<Item>) -> Result<()> {
    let mut cursor = bucket.cursor()?;
    let mut row = match dir {
        Direction::Asc => cursor.seek(prefix)?,
        Direction::Desc => match prefix_successor(prefix) {
            Some(bound) => match cursor.seek(&bound)? {
                Some(_) => cursor.prev()?,
                None => cursor.last()?,
            },
            None => cursor.last()?,
        },
    };
    while let Some((key, value)) = row {
        if !key.starts_with(prefix) {
            break;
        }
        if !push_item(&key, value, window, out) {
            break;
        }
        row = match dir {
            Direction::Asc => cursor.next()?,
            Direction::Desc => cursor.prev()?,
        };
    }
    Ok(())
}

fn key_range(
    bucket: &BaseBucket,
    min: Option<&[u8]>,
    max: Option<&[u8]>,
    dir: Direction,
    window: &mut Window,
    out: &mut Vec<Item>,
) -> Result<()> {
    let mut cursor = bucket.cursor()?;
    let mut row = match dir {
        Direction::Asc => match min {
            Some(m) => cursor.seek(m)?,
            None => cursor.first()?,
        },
        Direction::Desc => match max {
            Some(m) => {
                let bound = successor(m);
                match cursor.seek(&bound)? {
                    Some(_) => cursor.prev()?,
                    None => cursor.last()?,
                }
            }
            None => cursor.last()?,
        },
    };
    while let Some((key, value)) = row {
        if let Some(m) = max {
            if dir == Direction::Asc && key.as_slice() > m {
                break;
            }
        }
        if let Some(m) = min {
            if dir == Direction::Desc && key.as_slice() < m {
                break;
            }
        }
        if !push_item(&key, value, window, out) {
            break;
        }
        row = match dir {
            Direction::Asc => cursor.next()?,
            Direction::Desc => cursor.prev()?,
        };
    }
    Ok(())
}

fn resolve(bucket: &BaseBucket, primary_key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
    Ok(bucket.get(primary_key)?.map(|v| (primary_key.to_vec(), v)))
}

fn prop_value_match(
    bucket: &BaseBucket,
    property: &str,
    value: &IndexedValue,
    dir: Direction,
    window: &mut Window,
    out: &mut Vec<Item>,
) -> Result<()> {
    if matches!(value, IndexedValue::NoIndex) {
        return Ok(());
    }
    let mut cursor = bucket.index_cursor(property)?;
    let target_bytes = index_key::truncated_value_bytes(value);
    let mut row = match dir {
        Direction::Asc => cursor.seek_first(value)?,
        Direction::Desc => cursor.seek_last(value)?,
    };
    while let Some(idx) = row {
        let matches = idx.value_type().ok() == Some(value.tag()) && idx.value_bytes().ok() == target_bytes;
        if !matches {
            break;
        }
        if let Some((key, val)) = resolve(bucket, idx.primary_key())? {
            if !push_item(&key, val, window, out) {
                break;
            }
        }
        row = match dir {
            Direction::Asc => cursor.next()?,
            Direction::Desc => cursor.prev()?,
        };
    }
    Ok(())
}

fn prop_value_prefix(
    bucket: &BaseBucket,
    property: &str,
    prefix: &str,
    dir: Direction,
    window: &mut Window,
    out: &mut Vec<Item>,
) -> Result<()> {
    let value = IndexedValue::String(prefix.to_string());
    let mut cursor = bucket.index_cursor(property)?;
    let mut row = match dir {
        Direction::Asc => cursor.seek_first(&value)?,
        Direction::Desc => cursor.seek_last(&value)?,
    };
    let prefix_bytes = prefix.as_bytes();
    while let Some(idx) = row {
        let is_string = idx.value_type().ok() == Some(crate::value::TAG_STRING);
        let has_prefix = idx.value_bytes().map(|b| b.starts_with(prefix_bytes)).unwrap_or(false);
        if !(is_string && has_prefix) {
            break;
        }
        if let Some((key, val)) = resolve(bucket, idx.primary_key())? {
            if !push_item(&key, val, window, out) {
                break;
            }
        }
        row = match dir {
            Direction::Asc => cursor.next()?,
            Direction::Desc => cursor.prev()?,
        };
    }
    Ok(())
}

fn prop_value_range(
    bucket: &BaseBucket,
    property: &str,
    min: Option<&IndexedValue>,
    max: Option<&IndexedValue>,
    dir: Direction,
    window: &mut Window,
    out: &mut Vec<Item>,
) -> Result<()> {
    if let (Some(a), Some(b)) = (min, max) {
        if a.tag() != b.tag() {
            return Ok(());
        }
    }
    let mut cursor = bucket.index_cursor(property)?;
    let mut row = match dir {
        Direction::Asc => match min {
            Some(m) => cursor.seek_first(m)?,
            None => cursor.first()?,
        },
        Direction::Desc => match max {
            Some(m) => cursor.seek_last(m)?,
            None => cursor.last()?,
        },
    };
    while let Some(idx) = row {
        let tag = idx.value_type().ok();
        let bytes = idx.value_bytes().ok();
        match classify_row(tag, bytes.as_deref(), min, max, dir) {
            RowVerdict::After => break,
            RowVerdict::Before => {}
            RowVerdict::Within => {
                if let Some((key, val)) = resolve(bucket, idx.primary_key())? {
                    if !push_item(&key, val, window, out) {
                        break;
                    }
                }
            }
        }
        row = match dir {
            Direction::Asc => cursor.next()?,
            Direction::Desc => cursor.prev()?,
        };
    }
    Ok(())
}

/// Where a row falls relative to a `[min, max]` window during an ordered
/// walk: before it (wrong type or too small/large on the side not yet
/// reached — skip and keep walking), within it (emit), or after it (walked
/// past the window for good — stop).
enum RowVerdict {
    Before,
    Within,
    After,
}

fn classify_row(
    tag: Option<u8>,
    bytes: Option<&[u8]>,
    min: Option<&IndexedValue>,
    max: Option<&IndexedValue>,
    dir: Direction,
) -> RowVerdict {
    let (tag, bytes) = match (tag, bytes) {
        (Some(t), Some(b)) => (t, b),
        _ => return RowVerdict::After,
    };

    // Rows of a type other than the bound(s) sort into their own tag group,
    // entirely before or entirely after the target group depending on tag
    // order — never interleaved with it. Skip while still approaching the
    // target group, stop once we've left it.
    let target_tag = min.map(|v| v.tag()).or_else(|| max.map(|v| v.tag()));
    if let Some(tt) = target_tag {
        if tag != tt {
            let lower = tag < tt;
            return match (lower, dir) {
                (true, Direction::Asc) | (false, Direction::Desc) => RowVerdict::Before,
                (false, Direction::Asc) | (true, Direction::Desc) => RowVerdict::After,
            };
        }
    }

    if let Some(m) = min {
        if let Some(mb) = index_key::truncated_value_bytes(m) {
            if bytes < mb.as_slice() {
                return if dir == Direction::Asc { RowVerdict::Before } else { RowVerdict::After };
            }
        }
    }
    if let Some(m) = max {
        if let Some(mb) = index_key::truncated_value_bytes(m) {
            if bytes > mb.as_slice() {
                return if dir == Direction::Asc { RowVerdict::After } else { RowVerdict::Before };
            }
        }
    }
    RowVerdict::Within
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::Transaction;
    use redb::{Database, ReadableDatabase};
    use tempfile::NamedTempFile;

    fn open_bucket_with(rows: &[(&str, &str)]) -> (NamedTempFile, Database) {
        let file = NamedTempFile::new().unwrap();
        let db = Database::create(file.path()).unwrap();
        {
            let txn = Transaction::write(db.begin_write().unwrap());
            txn.create_bucket_if_not_exists("items").unwrap();
            {
                let bucket = BaseBucket::new(&txn, "items");
                for (k, v) in rows {
                    bucket.put(k.as_bytes(), v.as_bytes()).unwrap();
                }
            }
            txn.commit().unwrap();
        }
        (file, db)
    }

    #[test]
    fn order_by_asc_and_desc() {
        let (_file, db) = open_bucket_with(&[("a", "{}"), ("b", "{}"), ("c", "{}")]);
        let txn = Transaction::read(db.begin_read().unwrap());
        let bucket = BaseBucket::new(&txn, "items");

        let q = Query::new().with_filter(Filter::OrderBy { dir: Direction::Asc });
        let items = execute(&bucket, &q).unwrap();
        assert_eq!(items.iter().map(|i| i.key.clone()).collect::<Vec<_>>(), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

        let q = Query::new().with_filter(Filter::OrderBy { dir: Direction::Desc });
        let items = execute(&bucket, &q).unwrap();
        assert_eq!(items.iter().map(|i| i.key.clone()).collect::<Vec<_>>(), vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]);
    }

    #[test]
    fn offset_and_limit_window() {
        let (_file, db) = open_bucket_with(&[("a", "{}"), ("b", "{}"), ("c", "{}"), ("d", "{}")]);
        let txn = Transaction::read(db.begin_read().unwrap());
        let bucket = BaseBucket::new(&txn, "items");
        let q = Query::new()
            .with_filter(Filter::OrderBy { dir: Direction::Asc })
            .with_offset(1)
            .with_limit(2);
        let items = execute(&bucket, &q).unwrap();
        assert_eq!(items.iter().map(|i| i.key.clone()).collect::<Vec<_>>(), vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn key_prefix_bounds_the_walk() {
        let (_file, db) = open_bucket_with(&[("ab1", "{}"), ("ab2", "{}"), ("ac1", "{}")]);
        let txn = Transaction::read(db.begin_read().unwrap());
        let bucket = BaseBucket::new(&txn, "items");
        let q = Query::new().with_filter(Filter::KeyPrefix {
            prefix: b"ab".to_vec(),
            dir: Direction::Asc,
        });
        let items = execute(&bucket, &q).unwrap();
        assert_eq!(items.len(), 2);

        let q = Query::new().with_filter(Filter::KeyPrefix {
            prefix: b"ab".to_vec(),
            dir: Direction::Desc,
        });
        let items = execute(&bucket, &q).unwrap();
        assert_eq!(items.iter().map(|i| i.key.clone()).collect::<Vec<_>>(), vec![b"ab2".to_vec(), b"ab1".to_vec()]);
    }

    #[test]
    fn prop_value_match_resolves_documents() {
        let (_file, db) = open_bucket_with(&[("u1", r#"{"city":"ny"}"#), ("u2", r#"{"city":"sf"}"#), ("u3", r#"{"city":"ny"}"#)]);
        let txn = Transaction::read(db.begin_read().unwrap());
        let bucket = BaseBucket::new(&txn, "items");
        let q = Query::new().with_filter(Filter::PropValueMatch {
            property: "city".into(),
            value: IndexedValue::String("ny".into()),
            dir: Direction::Asc,
        });
        let items = execute(&bucket, &q).unwrap();
        assert_eq!(items.iter().map(|i| i.key.clone()).collect::<Vec<_>>(), vec![b"u1".to_vec(), b"u3".to_vec()]);
    }

    #[test]
    fn prop_value_range_rejects_cross_type_bounds() {
        let (_file, db) = open_bucket_with(&[("u1", r#"{"age":30}"#)]);
        let txn = Transaction::read(db.begin_read().unwrap());
        let bucket = BaseBucket::new(&txn, "items");
        let q = Query::new().with_filter(Filter::PropValueRange {
            property: "age".into(),
            min: Some(IndexedValue::String("a".into())),
            max: Some(IndexedValue::Float64(100.0)),
            dir: Direction::Asc,
        });
        let items = execute(&bucket, &q).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn prop_value_range_skips_rows_of_a_different_type_before_reaching_the_bound() {
        // "age" is indexed with mixed types across documents: bools sort
        // into a lower tag group than floats. A single-sided range (max
        // only) walking ascending from the very start of the property's
        // index must skip over the bool rows rather than emit them.
        let (_file, db) = open_bucket_with(&[
            ("u1", r#"{"age":true}"#),
            ("u2", r#"{"age":10}"#),
            ("u3", r#"{"age":20}"#),
        ]);
        let txn = Transaction::read(db.begin_read().unwrap());
        let bucket = BaseBucket::new(&txn, "items");
        let q = Query::new().with_filter(Filter::PropValueRange {
            property: "age".into(),
            min: None,
            max: Some(IndexedValue::Float64(100.0)),
            dir: Direction::Asc,
        });
        let items = execute(&bucket, &q).unwrap();
        assert_eq!(
            items.iter().map(|i| i.key.clone()).collect::<Vec<_>>(),
            vec![b"u2".to_vec(), b"u3".to_vec()]
        );
    }

    #[test]
    fn prop_value_range_filters_within_bounds() {
        let (_file, db) = open_bucket_with(&[("u1", r#"{"age":10}"#), ("u2", r#"{"age":20}"#), ("u3", r#"{"age":30}"#)]);
        let txn = Transaction::read(db.begin_read().unwrap());
        let bucket = BaseBucket::new(&txn, "items");
        let q = Query::new().with_filter(Filter::PropValueRange {
            property: "age".into(),
            min: Some(IndexedValue::Float64(15.0)),
            max: Some(IndexedValue::Float64(25.0)),
            dir: Direction::Asc,
        });
        let items = execute(&bucket, &q).unwrap();
        assert_eq!(items.iter().map(|i| i.key.clone()).collect::<Vec<_>>(), vec![b"u2".to_vec()]);
    }
}
