use indexmap::IndexMap;

/// Genomic coordinate type (0-based).
pub type PosType = u64;

/// Named annotation values of a region, in schema order.
pub type AnnotMap = IndexMap<String, String>;
