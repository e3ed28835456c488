//! Log file reading
//!
//! Frame extraction from BLF files. The reader is single-pass: the whole
//! stream is collected into memory and the file handle is released before
//! any chunk decoding starts.

pub mod blf;

pub use blf::{read_frames, BlfFrameIterator, BlfReader};
