//! MF4 (Measurement Data Format 4) container writing
//!
//! Persists consolidated signal series into a single ASAM MDF 4.10 file,
//! one channel group per signal.

pub mod writer;

pub use writer::save_signals;
