//! Key material: immutable snapshots and the manager that rotates them.

pub mod manager;
pub mod set;
