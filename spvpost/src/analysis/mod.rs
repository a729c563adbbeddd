//! Read-only analyses the passes are built on.
pub mod classify;
pub mod reachability;
