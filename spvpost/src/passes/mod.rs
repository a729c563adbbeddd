//! The individual steps of [`finalize`](crate::finalize()).
//!
//! Each pass only inspects the module and returns what should change; the
//! changes are applied together once every pass succeeded.
pub mod aliasing;
pub mod alignment;
pub mod capabilities;
pub mod prune;
pub mod storage;
