//! Chunk decoding
//!
//! Decodes one bounded batch of frames against the requested signal filter.
//! The function is a pure function of its inputs and holds no state, so the
//! orchestrator may run it sequentially or on a worker pool without changing
//! merge semantics.

use crate::signals::SignalDatabase;
use crate::types::{BusFrame, PartialResult};
use std::collections::BTreeSet;

/// Decode one chunk of frames into a [`PartialResult`]
///
/// Per-frame decode failures (unknown CAN ID, payload too short for a
/// defined signal) are non-fatal: the frame is skipped and decoding
/// continues. Signals outside the filter set are discarded silently.
/// Within the result, every series preserves frame arrival order.
pub fn decode_chunk(
    db: &SignalDatabase,
    frames: &[BusFrame],
    wanted: &BTreeSet<String>,
) -> PartialResult {
    let mut result = PartialResult::new();

    for frame in frames {
        let decoded = match db.decode_frame(frame.can_id, &frame.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::trace!("Skipping frame at t={}: {}", frame.timestamp, e);
                continue;
            }
        };

        for (name, value) in decoded {
            if wanted.contains(&name) {
                result.record(&name, frame.timestamp, value.to_string());
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
    use std::collections::HashMap;

    fn signal(name: &str, start_bit: u16, length: u16, factor: f64) -> SignalDefinition {
        SignalDefinition {
            name: name.to_string(),
            start_bit,
            length,
            byte_order: ByteOrder::LittleEndian,
            value_type: ValueType::Unsigned,
            factor,
            offset: 0.0,
            unit: None,
            value_table: None,
            multiplexer_values: None,
        }
    }

    /// Database with two messages:
    /// - 0x01 carries `signal1` (scaled by 0.001)
    /// - 0x02 carries `signal1` (scaled by 0.001) and `signal3` (value table)
    fn test_db() -> SignalDatabase {
        let mut db = SignalDatabase::new();
        db.add_message(MessageDefinition {
            id: 0x01,
            name: "MessageA".to_string(),
            size: 8,
            signals: vec![signal("signal1", 0, 16, 0.001)],
            multiplexer_signal: None,
            source: "test.dbc".to_string(),
        });
        let mut signal3 = signal("signal3", 16, 8, 1.0);
        signal3.value_table = Some(HashMap::from([(7, "text".to_string())]));
        db.add_message(MessageDefinition {
            id: 0x02,
            name: "MessageB".to_string(),
            size: 8,
            signals: vec![signal("signal1", 0, 16, 0.001), signal3],
            multiplexer_signal: None,
            source: "test.dbc".to_string(),
        });
        db
    }

    fn wanted(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_decode_chunk_filters_and_formats() {
        let db = test_db();
        // 1234 -> 1.234, second frame: 2345 -> 2.345 plus signal3 = "text"
        let frames = vec![
            BusFrame { can_id: 0x01, data: vec![0xD2, 0x04], timestamp: 0.1 },
            BusFrame { can_id: 0x02, data: vec![0x29, 0x09, 0x07], timestamp: 0.2 },
        ];

        let result = decode_chunk(&db, &frames, &wanted(&["signal1"]));

        assert_eq!(result.found, wanted(&["signal1"]));
        assert_eq!(result.series_by_name.len(), 1);
        let series = &result.series_by_name["signal1"];
        assert_eq!(series.samples()[0].timestamp, 0.1);
        assert_eq!(series.samples()[0].value, "1.234");
        assert_eq!(series.samples()[1].timestamp, 0.2);
        assert_eq!(series.samples()[1].value, "2.345");
    }

    #[test]
    fn test_decode_chunk_text_values() {
        let db = test_db();
        let frames = vec![BusFrame { can_id: 0x02, data: vec![0x29, 0x09, 0x07], timestamp: 0.2 }];

        let result = decode_chunk(&db, &frames, &wanted(&["signal3"]));

        assert_eq!(result.series_by_name["signal3"].samples()[0].value, "text");
    }

    #[test]
    fn test_decode_chunk_unknown_ids_are_skipped() {
        let db = test_db();
        let frames = vec![
            BusFrame { can_id: 0x99, data: vec![0x00, 0x01], timestamp: 0.1 },
            BusFrame { can_id: 0x98, data: vec![0x02, 0x03], timestamp: 0.2 },
        ];

        let result = decode_chunk(&db, &frames, &wanted(&["signal1"]));

        assert!(result.series_by_name.is_empty());
        assert!(result.found.is_empty());
    }

    #[test]
    fn test_decode_chunk_unmatched_filter() {
        let db = test_db();
        let frames = vec![BusFrame { can_id: 0x01, data: vec![0xD2, 0x04], timestamp: 0.1 }];

        let result = decode_chunk(&db, &frames, &wanted(&["signal4"]));

        assert!(result.series_by_name.is_empty());
        assert!(result.found.is_empty());
    }
}
