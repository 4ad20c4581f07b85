//! System utilities module
//!
//! Thread-safe primitives shared across components: per-key mutual
//! exclusion (`Locker`), used by the Lifecycle Manager to serialize
//! per-application operations and by the Proxy Manager for its global
//! reload lock.

mod locker;

pub use locker::{Locker, LockerError, LockerGuard};
