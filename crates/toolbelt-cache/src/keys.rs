//! Key conventions for the local-backend emulations.
//!
//! Hash fields map to composite `key:field` keys and lists to a
//! head/tail index pair plus a contiguous element band. The delimiter is
//! not escaped: callers avoid colons in hash keys and fields, and avoid
//! scalar keys matching the list index patterns, by convention.

/// Composite key for one hash field.
pub(crate) fn composite_key(key: &str, field: &str) -> String {
    format!("{key}:{field}")
}

/// Scan prefix covering every field of a hash.
pub(crate) fn hash_prefix(key: &str) -> String {
    format!("{key}:")
}

/// Index key holding the inclusive head position of a list.
pub(crate) fn head_key(key: &str) -> String {
    format!("{key}:head")
}

/// Index key holding the exclusive tail position of a list.
pub(crate) fn tail_key(key: &str) -> String {
    format!("{key}:tail")
}

/// Element key for position `index` of a list.
pub(crate) fn elem_key(key: &str, index: i64) -> String {
    format!("{key}:elem:{index}")
}
