//! Duplicate detection and field reconciliation.

/// Windowed merge engine.
pub mod merge;
/// Per-field conflict resolution policy.
pub mod resolver;
