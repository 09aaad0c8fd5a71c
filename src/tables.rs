//! Physical redb table naming. redb has no nested-bucket primitive, so the
//! spec's three logical namespaces (`D`, `I`, `B`) plus the sequence-counter
//! addition (§4.7 of SPEC_FULL.md) are each realized as flat tables, named
//! with a `\0` separator that cannot appear inside a `&str` bucket or
//! property name.

use redb::TableDefinition;

/// All physical tables in this store are byte-keyed, byte-valued.
pub(crate) type BytesTable<'n> = TableDefinition<'n, &'static [u8], &'static [u8]>;

/// Flat bucket registry: bucket name -> marker byte `b"e"`.
pub(crate) const REGISTRY_TABLE_NAME: &str = "b";

/// Per-bucket sequence counters: bucket name -> 8-byte big-endian counter.
pub(crate) const SEQUENCE_TABLE_NAME: &str = "s";

pub(crate) fn data_table_name(bucket: &str) -> String {
    format!("d\u{0}{bucket}")
}

/// Existence marker for a bucket's index namespace. Its presence, alongside
/// the data table's, is what "symmetric sub-namespaces" (spec §3) checks.
/// Individual property tables live alongside it, named by
/// [`index_prop_table_name`].
pub(crate) fn index_root_table_name(bucket: &str) -> String {
    format!("i\u{0}{bucket}")
}

pub(crate) fn index_prop_table_name(bucket: &str, property: &str) -> String {
    format!("i\u{0}{bucket}\u{0}{property}")
}

/// Prefix shared by every property table of `bucket`, used to enumerate
/// `indexed_properties`.
pub(crate) fn index_prop_table_prefix(bucket: &str) -> String {
    format!("i\u{0}{bucket}\u{0}")
}

pub(crate) fn table(name: &str) -> BytesTable<'_> {
    BytesTable::new(name)
}
