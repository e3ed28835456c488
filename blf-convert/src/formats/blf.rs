//! BLF (Binary Log Format) file reader
//!
//! Reads Vector BLF files using the `ablf` crate and yields [`BusFrame`]s
//! with timestamps converted from nanoseconds to seconds.
//!
//! ## Supported object types
//! - Type 86 (CanMessage2): CAN 2.0 and CAN-FD messages
//! - Types 100/101 (CanFdMessage, CanFdMessage64): dedicated CAN-FD objects
//! - Type 10 (LogContainer): transparently decompressed by ablf
//!
//! Error frames (type 73) and other unsupported object types carry nothing
//! decodable and are skipped; each unsupported type is warned about once.

use crate::types::{BusFrame, ConvertError, Result};
use ablf::{BlfFile, ObjectTypes};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// BLF file reader
pub struct BlfReader;

impl BlfReader {
    /// Open a BLF file and return an iterator over its CAN frames
    pub fn open(path: &Path) -> Result<BlfFrameIterator> {
        log::info!("Opening BLF file: {:?}", path);

        if !path.exists() {
            return Err(ConvertError::LogParse(format!(
                "BLF file not found: {:?}",
                path
            )));
        }

        let file = File::open(path)
            .map_err(|e| ConvertError::LogParse(format!("Failed to open BLF file: {}", e)))?;
        let reader = BufReader::new(file);

        let blf = BlfFile::from_reader(reader)
            .map_err(|(e, _)| ConvertError::LogParse(format!("Failed to parse BLF file: {}", e)))?;

        if !blf.is_valid() {
            return Err(ConvertError::LogParse("Invalid BLF file format".to_string()));
        }

        Ok(BlfFrameIterator {
            objects: blf.into_iter(),
            skipped_types: HashSet::new(),
        })
    }
}

/// Iterator over the CAN frames of a BLF file
pub struct BlfFrameIterator {
    objects: ablf::ObjectIterator<BufReader<File>>,
    skipped_types: HashSet<u32>,
}

impl Iterator for BlfFrameIterator {
    type Item = BusFrame;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let obj = self.objects.next()?;
            match obj.data {
                ObjectTypes::CanMessage86(msg) => {
                    return Some(BusFrame {
                        can_id: msg.id,
                        data: msg.data,
                        timestamp: msg.header.timestamp_ns as f64 / 1e9,
                    });
                }
                ObjectTypes::CanFdMessage100(msg) => {
                    let len = (msg.valid_data_bytes as usize).min(msg.data.len());
                    return Some(BusFrame {
                        can_id: msg.id,
                        data: msg.data[..len].to_vec(),
                        timestamp: msg.header.timestamp_ns as f64 / 1e9,
                    });
                }
                ObjectTypes::CanFdMessage64(msg) => {
                    return Some(BusFrame {
                        can_id: msg.id,
                        data: msg.data,
                        timestamp: msg.header.timestamp_ns as f64 / 1e9,
                    });
                }
                ObjectTypes::CanErrorExt73(_) => {
                    // Error frames carry no decodable payload
                    continue;
                }
                ObjectTypes::AppText65(_) => continue,
                ObjectTypes::LogContainer10(_) => {
                    // Containers are unpacked by the ablf iterator itself
                    continue;
                }
                ObjectTypes::UnsupportedPadded { .. } => continue,
                ObjectTypes::Unsupported(_) => {
                    let obj_type = obj.object_type;
                    if self.skipped_types.insert(obj_type) {
                        log::warn!(
                            "Skipping unsupported BLF object type {} (size {} bytes)",
                            obj_type,
                            obj.object_size
                        );
                    }
                    continue;
                }
            }
        }
    }
}

/// Read all CAN frames of a BLF file into memory
///
/// The file is read once, sequentially; the handle is closed before this
/// function returns, so decoding never races the reader.
pub fn read_frames(path: &Path) -> Result<Vec<BusFrame>> {
    let frames: Vec<BusFrame> = BlfReader::open(path)?.collect();
    log::info!("Read {} CAN frames from {:?}", frames.len(), path);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blf_file_not_found() {
        let result = BlfReader::open(Path::new("nonexistent.blf"));
        assert!(result.is_err());
    }

    #[test]
    fn test_read_frames_propagates_open_error() {
        let result = read_frames(Path::new("nonexistent.blf"));
        assert!(matches!(result, Err(ConvertError::LogParse(_))));
    }
}
