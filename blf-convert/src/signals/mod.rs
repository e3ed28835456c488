//! Signal database and DBC parsing
//!
//! This module contains the DBC parser and the unified signal database that
//! decodes raw frame payloads into named values.

pub mod database;
pub mod dbc;

// Re-export key types for convenience
pub use database::{
    ByteOrder, MessageDefinition, SignalDatabase, SignalDefinition, ValueType,
};
