//! Token lifecycle on top of the key-set manager.

pub mod claim;
pub mod codec;
pub mod nonblocking;
pub mod service;
pub mod settings;
