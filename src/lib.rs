//! An embedded, single-file document store with automatic secondary
//! indexing, built on [`redb`](https://docs.rs/redb).
//!
//! Documents are arbitrary JSON objects, keyed by caller-chosen byte keys
//! within a named bucket. Every scalar top-level property (anything not
//! prefixed with `_`) is automatically kept in a secondary index as
//! documents are written, so queries can order or filter by key or by
//! property value without a separate indexing pass.
//!
//! ```no_run
//! use bucketdb::{Bucket, Query, Store, StoreOptions};
//!
//! # fn run() -> bucketdb::Result<()> {
//! let store = Store::open("data.redb", StoreOptions::default())?;
//! store.update(|txn| txn.create_bucket_if_not_exists("users"))?;
//!
//! let users = Bucket::new(&store, "users");
//! users.put(b"u1", br#"{"name": "alice", "age": 30}"#)?;
//!
//! let _rows = users.query(&Query::new())?;
//! # Ok(())
//! # }
//! ```

mod base_bucket;
mod bucket;
mod cursor;
mod error;
mod filter;
mod index_cursor;
mod index_key;
mod options;
mod query;
mod store;
mod tables;
mod tx;
mod util;
mod value;

pub use bucket::{Bucket, TxBucket};
pub use error::{Error, Result};
pub use filter::Filter;
pub use options::StoreOptions;
pub use query::{Direction, Item, Query};
pub use store::Store;
pub use tx::Transaction;
pub use value::{IndexedValue, ToIndexedValue};
