//! DBC file parser
//!
//! Parses Vector DBC files and converts them into the internal signal
//! database format, including value tables for enum-like signals.

use crate::signals::database::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
use crate::types::{ConvertError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Parse a DBC file and return message definitions
pub fn parse_dbc_file(path: &Path) -> Result<Vec<MessageDefinition>> {
    log::info!("Parsing DBC file: {:?}", path);

    // Read as bytes first to handle non-UTF8 encodings.
    let bytes = std::fs::read(path)
        .map_err(|e| ConvertError::DbcParse(format!("Failed to read file {:?}: {}", path, e)))?;

    // Try UTF-8 first, fall back to Latin-1 (compatible with Windows-1252).
    let dbc_content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(err) => {
            log::warn!("DBC file is not UTF-8, trying Latin-1 encoding");
            err.as_bytes().iter().map(|&b| b as char).collect()
        }
    };

    let dbc = can_dbc::DBC::from_slice(dbc_content.as_bytes())
        .map_err(|e| ConvertError::DbcParse(format!("Failed to parse DBC file {:?}: {:?}", path, e)))?;

    let source_filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.dbc")
        .to_string();

    // Collect value tables up front, keyed by (message id, signal name).
    let mut value_tables: HashMap<(u32, String), HashMap<i64, String>> = HashMap::new();
    for description in dbc.value_descriptions() {
        if let can_dbc::ValueDescription::Signal {
            message_id,
            signal_name,
            value_descriptions,
        } = description
        {
            let table = value_descriptions
                .iter()
                .map(|d| (*d.a() as i64, d.b().clone()))
                .collect();
            value_tables.insert((message_id.0, signal_name.clone()), table);
        }
    }

    let mut messages = Vec::new();
    for dbc_msg in dbc.messages() {
        messages.push(convert_message(dbc_msg, &value_tables, &source_filename));
    }

    log::info!("Parsed {} messages from {:?}", messages.len(), path);
    Ok(messages)
}

/// Convert a can-dbc message to our MessageDefinition
fn convert_message(
    dbc_msg: &can_dbc::Message,
    value_tables: &HashMap<(u32, String), HashMap<i64, String>>,
    source: &str,
) -> MessageDefinition {
    let message_id = dbc_msg.message_id().0;

    // Identify the multiplexer switch signal, if any.
    let multiplexer_signal = dbc_msg
        .signals()
        .iter()
        .find(|s| matches!(s.multiplexer_indicator(), can_dbc::MultiplexIndicator::Multiplexor))
        .map(|s| s.name().to_string());

    let signals = dbc_msg
        .signals()
        .iter()
        .map(|dbc_sig| {
            let value_table = value_tables
                .get(&(message_id, dbc_sig.name().to_string()))
                .cloned();
            convert_signal(dbc_sig, value_table)
        })
        .collect();

    MessageDefinition {
        id: message_id,
        name: dbc_msg.message_name().to_string(),
        size: *dbc_msg.message_size() as usize,
        signals,
        multiplexer_signal,
        source: source.to_string(),
    }
}

/// Convert a can-dbc signal to our SignalDefinition
fn convert_signal(
    dbc_sig: &can_dbc::Signal,
    value_table: Option<HashMap<i64, String>>,
) -> SignalDefinition {
    let byte_order = match *dbc_sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
        can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
    };

    let value_type = match *dbc_sig.value_type() {
        can_dbc::ValueType::Signed => ValueType::Signed,
        can_dbc::ValueType::Unsigned => ValueType::Unsigned,
    };

    let multiplexer_values = match *dbc_sig.multiplexer_indicator() {
        can_dbc::MultiplexIndicator::MultiplexedSignal(switch_value) => {
            Some(vec![switch_value as u64])
        }
        _ => None,
    };

    SignalDefinition {
        name: dbc_sig.name().to_string(),
        start_bit: *dbc_sig.start_bit() as u16,
        length: *dbc_sig.signal_size() as u16,
        byte_order,
        value_type,
        factor: *dbc_sig.factor(),
        offset: *dbc_sig.offset(),
        unit: if dbc_sig.unit().is_empty() {
            None
        } else {
            Some(dbc_sig.unit().to_string())
        },
        value_table,
        multiplexer_values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_simple_dbc() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1 ECU2

BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU2
 SG_ EngineTemp : 16|8@1+ (1,-40) [-40|215] "C" ECU2

BO_ 512 BatteryStatus: 8 ECU1
 SG_ BatteryVoltage : 0|16@1+ (0.01,0) [0|16] "V" ECU2
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(dbc_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let messages = parse_dbc_file(temp_file.path()).unwrap();
        assert_eq!(messages.len(), 2);

        let msg1 = &messages[0];
        assert_eq!(msg1.id, 291);
        assert_eq!(msg1.name, "EngineData");
        assert_eq!(msg1.size, 8);
        assert_eq!(msg1.signals.len(), 2);

        let sig1 = &msg1.signals[0];
        assert_eq!(sig1.name, "EngineSpeed");
        assert_eq!(sig1.start_bit, 0);
        assert_eq!(sig1.length, 16);
        assert_eq!(sig1.factor, 1.0);
        assert_eq!(sig1.offset, 0.0);
        assert_eq!(sig1.unit, Some("rpm".to_string()));
    }

    #[test]
    fn test_parse_and_decode_motorola_signal() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 291 SensorData: 8 ECU1
 SG_ RawByte : 7|8@0+ (1,0) [0|255] "" ECU1
 SG_ RawWord : 15|16@0+ (1,0) [0|65535] "" ECU1
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(dbc_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let mut db = crate::signals::SignalDatabase::new();
        db.add_dbc_file(temp_file.path()).unwrap();

        // 7|8@0+ is byte 0 verbatim; 15|16@0+ spans bytes 1 and 2 MSB first.
        let decoded = db.decode_frame(291, &[0xAB, 0xCD, 0xEF, 0x00]).unwrap();
        let by_name: HashMap<&str, &crate::types::SignalValue> =
            decoded.iter().map(|(n, v)| (n.as_str(), v)).collect();
        assert_eq!(by_name["RawByte"], &crate::types::SignalValue::Integer(0xAB));
        assert_eq!(by_name["RawWord"], &crate::types::SignalValue::Integer(0xCDEF));
    }

    #[test]
    fn test_parse_value_table() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 291 GearboxData: 8 ECU1
 SG_ GearState : 0|8@1+ (1,0) [0|3] "" ECU1

VAL_ 291 GearState 0 "Park" 1 "Drive" 2 "Reverse" ;
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(dbc_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let messages = parse_dbc_file(temp_file.path()).unwrap();
        assert_eq!(messages.len(), 1);

        let table = messages[0].signals[0].value_table.as_ref().unwrap();
        assert_eq!(table[&0], "Park");
        assert_eq!(table[&1], "Drive");
        assert_eq!(table[&2], "Reverse");
    }

    #[test]
    fn test_parse_multiplexed_signals() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1
 SG_ SignalB m1 : 8|16@1+ (0.1,0) [0|1000] "mV" ECU1
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(dbc_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let messages = parse_dbc_file(temp_file.path()).unwrap();
        assert_eq!(messages.len(), 1);

        let msg = &messages[0];
        assert_eq!(msg.multiplexer_signal, Some("Mode".to_string()));

        let sig_a = msg.signals.iter().find(|s| s.name == "SignalA").unwrap();
        assert_eq!(sig_a.multiplexer_values, Some(vec![0]));
        let sig_b = msg.signals.iter().find(|s| s.name == "SignalB").unwrap();
        assert_eq!(sig_b.multiplexer_values, Some(vec![1]));
    }
}
