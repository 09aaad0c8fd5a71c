//! Store open options. Kept intentionally thin: file opening, permissions,
//! and engine tuning are explicitly out of scope for the indexing core
//! (spec.md §1), but a complete crate still needs a place to plumb them
//! through, modeled on the teacher's `with_*`-builder config structs
//! (`IndexConfig`, `CompressionConfig`).

/// Options controlling how [`crate::Store::open`] behaves.
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Open the database read-only. Requires the file to already exist
    /// (spec §7 `ReadOnlyRequiresExistingFile`).
    pub read_only: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { read_only: false }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
