//! Signal database and frame decoding
//!
//! Combines signal definitions from one or more DBC files into a single
//! queryable database and decodes raw frame payloads into named values.
//! Handles bit extraction, endianness, sign extension, factor/offset
//! scaling, value tables and multiplexed signals.

use crate::types::{ConvertError, Result, SignalValue};
use std::collections::HashMap;

/// A complete CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Message size in bytes
    pub size: usize,
    /// All signals in this message
    pub signals: Vec<SignalDefinition>,
    /// Multiplexer signal name (if the message is multiplexed)
    pub multiplexer_signal: Option<String>,
    /// Source DBC filename
    pub source: String,
}

/// A CAN signal definition
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    /// Signal name
    pub name: String,
    /// Start bit in the frame payload
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    /// Byte order for extraction
    pub byte_order: ByteOrder,
    /// Signed or unsigned raw value
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Engineering unit (e.g. "km/h", "V")
    pub unit: Option<String>,
    /// Value table for enum-like values (raw value -> label)
    pub value_table: Option<HashMap<i64, String>>,
    /// Multiplexer switch values for which this signal is active
    /// (None if the signal is not multiplexed)
    pub multiplexer_values: Option<Vec<u64>>,
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Signed integer
    Signed,
    /// Unsigned integer
    Unsigned,
}

/// The unified signal database
///
/// Loaded once from the schema sources before any chunk is processed;
/// decoding itself takes `&self` only, so chunks can share it freely.
#[derive(Debug, Default)]
pub struct SignalDatabase {
    /// Message definitions by CAN ID
    messages: HashMap<u32, MessageDefinition>,
}

impl SignalDatabase {
    /// Create a new empty signal database
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a DBC file and add its definitions to the database
    ///
    /// A later definition for an already-known CAN ID replaces the earlier
    /// one, matching the load order of the schema sources.
    pub fn add_dbc_file(&mut self, path: &std::path::Path) -> Result<()> {
        log::info!("Loading DBC file: {:?}", path);
        for message in super::dbc::parse_dbc_file(path)? {
            self.add_message(message);
        }
        log::info!("DBC file loaded successfully: {:?}", path);
        Ok(())
    }

    /// Add a message definition to the database
    pub fn add_message(&mut self, message: MessageDefinition) {
        self.messages.insert(message.id, message);
    }

    /// Get a message definition by CAN ID
    pub fn get_message(&self, can_id: u32) -> Option<&MessageDefinition> {
        self.messages.get(&can_id)
    }

    /// Total number of message definitions
    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    /// Total number of signal definitions
    pub fn num_signals(&self) -> usize {
        self.messages.values().map(|m| m.signals.len()).sum()
    }

    /// Decode one frame payload into named signal values
    ///
    /// Fails with [`ConvertError::MessageNotFound`] for an unknown CAN ID and
    /// with [`ConvertError::PayloadTooShort`] when the payload cannot hold a
    /// defined signal. Both are per-frame conditions the chunk decoder
    /// treats as skippable.
    pub fn decode_frame(&self, can_id: u32, data: &[u8]) -> Result<Vec<(String, SignalValue)>> {
        let message = self
            .messages
            .get(&can_id)
            .ok_or(ConvertError::MessageNotFound(can_id))?;

        // For multiplexed messages, extract the switch value first.
        let mux_value = match &message.multiplexer_signal {
            Some(mux_name) => message
                .signals
                .iter()
                .find(|s| s.name == *mux_name)
                .and_then(|s| extract_raw(data, s))
                .map(|v| v as u64),
            None => None,
        };

        let mut decoded = Vec::with_capacity(message.signals.len());
        for signal in &message.signals {
            if let Some(active_for) = &signal.multiplexer_values {
                // Multiplexed signal: only decode when the switch matches.
                match mux_value {
                    Some(current) if active_for.contains(&current) => {}
                    _ => continue,
                }
            }

            let raw = extract_raw(data, signal)
                .ok_or_else(|| ConvertError::PayloadTooShort(signal.name.clone()))?;
            decoded.push((signal.name.clone(), interpret(signal, raw)));
        }
        Ok(decoded)
    }
}

/// Turn a raw extracted value into a typed signal value
fn interpret(signal: &SignalDefinition, raw: i64) -> SignalValue {
    if let Some(table) = &signal.value_table {
        if let Some(label) = table.get(&raw) {
            return SignalValue::Text(label.clone());
        }
    }

    if signal.length == 1 && signal.factor == 1.0 && signal.offset == 0.0 {
        SignalValue::Boolean(raw != 0)
    } else if signal.factor != 1.0 || signal.offset != 0.0 {
        SignalValue::Float(signal.offset + signal.factor * raw as f64)
    } else {
        SignalValue::Integer(raw)
    }
}

/// Extract the raw signal value from a frame payload
///
/// `start_bit` follows the DBC convention for both byte orders: for Intel
/// signals it names the LSB, for Motorola signals the MSB under standard
/// bit numbering (bit 7 is the MSB of byte 0).
///
/// Returns None when the payload is too short for the signal.
fn extract_raw(data: &[u8], signal: &SignalDefinition) -> Option<i64> {
    let start_bit = signal.start_bit as usize;
    let length = signal.length as usize;

    let raw = match signal.byte_order {
        ByteOrder::LittleEndian => {
            if (start_bit + length + 7) / 8 > data.len() {
                return None;
            }
            extract_little_endian(data, start_bit, length)
        }
        ByteOrder::BigEndian => {
            // Map the DBC start bit to the MSB-first walk position: `7|8@0+`
            // starts the walk at bit 0 of byte 0.
            let msb = 8 * (start_bit / 8) + (7 - start_bit % 8);
            if (msb + length + 7) / 8 > data.len() {
                return None;
            }
            extract_big_endian(data, msb, length)
        }
    };

    Some(match signal.value_type {
        ValueType::Unsigned => raw as i64,
        ValueType::Signed => sign_extend(raw, length),
    })
}

/// Extract bits with little-endian (Intel) byte order
///
/// The start bit points to the LSB of the signal; bits are counted from the
/// LSB upwards across consecutive payload bytes.
fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;
    for i in 0..length {
        let bit_pos = start_bit + i;
        let byte_idx = bit_pos / 8;
        let bit_in_byte = bit_pos % 8;
        let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
        result |= (bit_value as u64) << i;
    }
    result
}

/// Extract bits with big-endian (Motorola) byte order
///
/// `start_bit` here is the walk position of the signal MSB, counting
/// MSB-first from bit 0 of byte 0; callers convert from the DBC numbering
/// before calling.
fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;
    for i in 0..length {
        let bit_pos = start_bit + i;
        let byte_idx = bit_pos / 8;
        let bit_in_byte = 7 - (bit_pos % 8);
        let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
        result |= (bit_value as u64) << (length - 1 - i);
    }
    result
}

/// Sign-extend an N-bit value to 64 bits
fn sign_extend(value: u64, bit_length: usize) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }
    let sign_bit = 1u64 << (bit_length - 1);
    if (value & sign_bit) != 0 {
        (value | (!0u64 << bit_length)) as i64
    } else {
        value as i64
    }
}
