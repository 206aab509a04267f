//! Domain layer - Value objects, verification policy, and entitlement state.
//!
//! Nothing here performs I/O; provider access goes through `crate::ports`.

pub mod entitlement;
pub mod foundation;
pub mod trust;
