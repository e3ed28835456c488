//! MDF 4.10 block writer
//!
//! Writes one channel group per signal: a float time master channel plus a
//! value channel. Series whose formatted values all parse as numbers are
//! stored on a native float channel; everything else becomes a fixed-width
//! UTF-8 string channel. The block layout is computed up front so every
//! link is known before a single byte is written.

use crate::types::{ConvertError, Result, SignalSeries};
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the time master channel in every channel group
const TIME_CHANNEL_NAME: &str = "t";

// Block sizes (fixed-size blocks, header included)
const ID_LEN: u64 = 64;
const HD_LEN: u64 = 104;
const FH_LEN: u64 = 56;
const DG_LEN: u64 = 64;
const CG_LEN: u64 = 104;
const CN_LEN: u64 = 160;

// cn_data_type values
const DATA_TYPE_FLOAT_LE: u8 = 4;
const DATA_TYPE_STRING_UTF8: u8 = 7;

/// Save signal series to an MDF 4.10 file
///
/// Fails with [`ConvertError::InvalidSeries`] when the map is empty, a
/// signal name is empty, or a series holds no samples -- an empty
/// consolidated result must never silently produce an empty container.
///
/// With `overwrite` the destination is replaced; without it an existing
/// destination is left untouched and a numbered sibling
/// (`<stem>.<n>.mf4`) is written instead. Returns the path actually
/// written.
pub fn save_signals(
    series_by_name: &BTreeMap<String, SignalSeries>,
    path: &Path,
    overwrite: bool,
) -> Result<PathBuf> {
    if series_by_name.is_empty() {
        return Err(ConvertError::InvalidSeries("Signals are empty".to_string()));
    }

    let mut groups = Vec::with_capacity(series_by_name.len());
    for (name, series) in series_by_name {
        if name.is_empty() {
            return Err(ConvertError::InvalidSeries(
                "signal name must not be empty".to_string(),
            ));
        }
        if series.is_empty() {
            return Err(ConvertError::InvalidSeries(format!(
                "series '{}' has no samples",
                name
            )));
        }
        groups.push(Group::from_series(name, series));
    }

    let target = resolve_target(path, overwrite)?;
    let buf = render(&groups)?;
    std::fs::write(&target, buf)?;
    log::info!(
        "Wrote {} channel groups to MF4 container {:?}",
        groups.len(),
        target
    );
    Ok(target)
}

/// One channel group to be written
struct Group {
    name: String,
    timestamps: Vec<f64>,
    values: ChannelValues,
}

/// Value column of a channel group
enum ChannelValues {
    /// All samples parse as numbers: native float channel
    Float(Vec<f64>),
    /// Fixed-width, zero-padded UTF-8 string channel
    Text { width: usize, values: Vec<String> },
}

impl Group {
    fn from_series(name: &str, series: &SignalSeries) -> Self {
        let timestamps: Vec<f64> = series.samples().iter().map(|s| s.timestamp).collect();

        let parsed: Option<Vec<f64>> = series
            .samples()
            .iter()
            .map(|s| s.value.parse::<f64>().ok())
            .collect();

        let values = match parsed {
            Some(numbers) => ChannelValues::Float(numbers),
            None => {
                // Width includes a terminating NUL byte.
                let width = series
                    .samples()
                    .iter()
                    .map(|s| s.value.len())
                    .max()
                    .unwrap_or(0)
                    + 1;
                ChannelValues::Text {
                    width,
                    values: series.samples().iter().map(|s| s.value.clone()).collect(),
                }
            }
        };

        Self {
            name: name.to_string(),
            timestamps,
            values,
        }
    }

    fn value_bytes(&self) -> u32 {
        match &self.values {
            ChannelValues::Float(_) => 8,
            ChannelValues::Text { width, .. } => *width as u32,
        }
    }

    fn record_size(&self) -> u32 {
        8 + self.value_bytes()
    }

    fn cycle_count(&self) -> u64 {
        self.timestamps.len() as u64
    }
}

/// Pick the path to write, honouring the overwrite mode
fn resolve_target(path: &Path, overwrite: bool) -> Result<PathBuf> {
    if overwrite || !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("mf4");
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    for counter in 1u32.. {
        let candidate = dir.join(format!("{}.{}.{}", stem, counter, extension));
        if !candidate.exists() {
            log::warn!(
                "Destination {:?} exists, writing numbered sibling {:?}",
                path,
                candidate
            );
            return Ok(candidate);
        }
    }
    unreachable!("counter space exhausted");
}

/// Byte offsets of one group's blocks within the file
struct GroupLayout {
    dg: u64,
    cg: u64,
    cn_time: u64,
    cn_value: u64,
    tx_name: u64,
    dt: u64,
}

fn align8(len: u64) -> u64 {
    (len + 7) & !7
}

fn tx_block_len(text: &str) -> u64 {
    align8(24 + text.len() as u64 + 1)
}

/// Render the whole container into memory
fn render(groups: &[Group]) -> Result<Vec<u8>> {
    // First pass: lay out every block.
    let tx_time = ID_LEN + HD_LEN + FH_LEN;
    let mut offset = tx_time + tx_block_len(TIME_CHANNEL_NAME);
    let mut layouts = Vec::with_capacity(groups.len());
    for group in groups {
        let dg = offset;
        let cg = dg + DG_LEN;
        let cn_time = cg + CG_LEN;
        let cn_value = cn_time + CN_LEN;
        let tx_name = cn_value + CN_LEN;
        let dt = tx_name + tx_block_len(&group.name);
        let dt_len = 24 + group.cycle_count() * group.record_size() as u64;
        offset = dt + align8(dt_len);
        layouts.push(GroupLayout {
            dg,
            cg,
            cn_time,
            cn_value,
            tx_name,
            dt,
        });
    }

    // Second pass: serialize.
    let mut buf: Vec<u8> = Vec::with_capacity(offset as usize);

    write_id_block(&mut buf)?;
    write_hd_block(&mut buf, layouts[0].dg)?;
    write_fh_block(&mut buf)?;
    write_tx_block(&mut buf, TIME_CHANNEL_NAME)?;

    for (index, (group, layout)) in groups.iter().zip(&layouts).enumerate() {
        let dg_next = layouts.get(index + 1).map(|l| l.dg).unwrap_or(0);
        write_dg_block(&mut buf, dg_next, layout.cg, layout.dt)?;
        write_cg_block(&mut buf, layout.cn_time, group)?;
        write_time_channel(&mut buf, layout.cn_value, tx_time)?;
        write_value_channel(&mut buf, layout.tx_name, group)?;
        write_tx_block(&mut buf, &group.name)?;
        write_dt_block(&mut buf, group)?;
    }

    debug_assert_eq!(buf.len() as u64, offset);
    Ok(buf)
}

/// 64-byte identification block
fn write_id_block(buf: &mut Vec<u8>) -> Result<()> {
    buf.extend_from_slice(b"MDF     ");
    buf.extend_from_slice(b"4.10    ");
    buf.extend_from_slice(b"BlfConv ");
    buf.extend_from_slice(&[0u8; 4]);
    buf.write_u16::<LittleEndian>(410)?;
    buf.extend_from_slice(&[0u8; 34]);
    Ok(())
}

/// Common block header: id, reserved, length, link count, links
fn write_block_header(buf: &mut Vec<u8>, id: &[u8; 4], length: u64, links: &[u64]) -> Result<()> {
    buf.extend_from_slice(id);
    buf.write_u32::<LittleEndian>(0)?;
    buf.write_u64::<LittleEndian>(length)?;
    buf.write_u64::<LittleEndian>(links.len() as u64)?;
    for link in links {
        buf.write_u64::<LittleEndian>(*link)?;
    }
    Ok(())
}

fn write_hd_block(buf: &mut Vec<u8>, first_dg: u64) -> Result<()> {
    let start_time_ns = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .max(0) as u64;
    // Links: dg_first, fh_first, ch_first, at_first, ev_first, md_comment
    write_block_header(buf, b"##HD", HD_LEN, &[first_dg, ID_LEN + HD_LEN, 0, 0, 0, 0])?;
    buf.write_u64::<LittleEndian>(start_time_ns)?;
    buf.write_i16::<LittleEndian>(0)?; // tz offset
    buf.write_i16::<LittleEndian>(0)?; // dst offset
    buf.extend_from_slice(&[0u8; 4]); // time flags/class, hd flags, reserved
    buf.write_f64::<LittleEndian>(0.0)?; // start angle
    buf.write_f64::<LittleEndian>(0.0)?; // start distance
    Ok(())
}

fn write_fh_block(buf: &mut Vec<u8>) -> Result<()> {
    let time_ns = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .max(0) as u64;
    write_block_header(buf, b"##FH", FH_LEN, &[0, 0])?;
    buf.write_u64::<LittleEndian>(time_ns)?;
    buf.write_i16::<LittleEndian>(0)?;
    buf.write_i16::<LittleEndian>(0)?;
    buf.extend_from_slice(&[0u8; 4]); // flags + reserved
    Ok(())
}

fn write_tx_block(buf: &mut Vec<u8>, text: &str) -> Result<()> {
    let length = 24 + text.len() as u64 + 1;
    write_block_header(buf, b"##TX", length, &[])?;
    buf.extend_from_slice(text.as_bytes());
    buf.push(0);
    buf.resize(align8(buf.len() as u64) as usize, 0);
    Ok(())
}

fn write_dg_block(buf: &mut Vec<u8>, dg_next: u64, cg_first: u64, data: u64) -> Result<()> {
    write_block_header(buf, b"##DG", DG_LEN, &[dg_next, cg_first, data, 0])?;
    buf.push(0); // record id size: none
    buf.extend_from_slice(&[0u8; 7]);
    Ok(())
}

fn write_cg_block(buf: &mut Vec<u8>, cn_first: u64, group: &Group) -> Result<()> {
    // Links: cg_next, cn_first, tx_acq_name, si_acq_source, sr_first, md_comment
    write_block_header(buf, b"##CG", CG_LEN, &[0, cn_first, 0, 0, 0, 0])?;
    buf.write_u64::<LittleEndian>(0)?; // record id
    buf.write_u64::<LittleEndian>(group.cycle_count())?;
    buf.write_u16::<LittleEndian>(0)?; // flags
    buf.write_u16::<LittleEndian>(0)?; // path separator
    buf.write_u32::<LittleEndian>(0)?; // reserved
    buf.write_u32::<LittleEndian>(group.record_size())?;
    buf.write_u32::<LittleEndian>(0)?; // invalidation bytes
    Ok(())
}

/// Shared tail of a CN block after the type/offset fields
fn write_cn_tail(buf: &mut Vec<u8>) -> Result<()> {
    buf.write_u32::<LittleEndian>(0)?; // flags
    buf.write_u32::<LittleEndian>(0)?; // invalidation bit position
    buf.push(0); // precision
    buf.push(0); // reserved
    buf.write_u16::<LittleEndian>(0)?; // attachment count
    for _ in 0..6 {
        buf.write_f64::<LittleEndian>(0.0)?; // value range / limits
    }
    Ok(())
}

fn write_time_channel(buf: &mut Vec<u8>, cn_next: u64, tx_name: u64) -> Result<()> {
    // Links: cn_next, composition, tx_name, si_source, cc, data, md_unit, md_comment
    write_block_header(buf, b"##CN", CN_LEN, &[cn_next, 0, tx_name, 0, 0, 0, 0, 0])?;
    buf.push(2); // cn_type: time master
    buf.push(1); // sync_type: time
    buf.push(DATA_TYPE_FLOAT_LE);
    buf.push(0); // bit offset
    buf.write_u32::<LittleEndian>(0)?; // byte offset
    buf.write_u32::<LittleEndian>(64)?; // bit count
    write_cn_tail(buf)
}

fn write_value_channel(buf: &mut Vec<u8>, tx_name: u64, group: &Group) -> Result<()> {
    let data_type = match &group.values {
        ChannelValues::Float(_) => DATA_TYPE_FLOAT_LE,
        ChannelValues::Text { .. } => DATA_TYPE_STRING_UTF8,
    };
    write_block_header(buf, b"##CN", CN_LEN, &[0, 0, tx_name, 0, 0, 0, 0, 0])?;
    buf.push(0); // cn_type: fixed length data
    buf.push(0); // sync_type: none
    buf.push(data_type);
    buf.push(0); // bit offset
    buf.write_u32::<LittleEndian>(8)?; // byte offset, after the time column
    buf.write_u32::<LittleEndian>(group.value_bytes() * 8)?; // bit count
    write_cn_tail(buf)
}

fn write_dt_block(buf: &mut Vec<u8>, group: &Group) -> Result<()> {
    let payload = group.cycle_count() * group.record_size() as u64;
    write_block_header(buf, b"##DT", 24 + payload, &[])?;
    match &group.values {
        ChannelValues::Float(values) => {
            for (timestamp, value) in group.timestamps.iter().zip(values) {
                buf.write_f64::<LittleEndian>(*timestamp)?;
                buf.write_f64::<LittleEndian>(*value)?;
            }
        }
        ChannelValues::Text { width, values } => {
            for (timestamp, value) in group.timestamps.iter().zip(values) {
                buf.write_f64::<LittleEndian>(*timestamp)?;
                let mut field = vec![0u8; *width];
                field[..value.len()].copy_from_slice(value.as_bytes());
                buf.extend_from_slice(&field);
            }
        }
    }
    buf.resize(align8(buf.len() as u64) as usize, 0);
    Ok(())
}
