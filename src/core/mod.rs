//! Record identity, ordering and grouping.

/// Time-ordered grouping of records by merge key.
pub mod bucket;
/// Merge group key and contact start timestamp.
pub mod key;
