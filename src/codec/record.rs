//! Record parsing for the decrypted frame body.
//!
//! The body between the device id and the CRC is a run of records, each
//! `[param, type|len, value...]`, closed by a single zero byte. The upper
//! nibble of the type byte selects the wire type, the lower nibble gives
//! the value length in bytes. Fixed-point types carry their binary point
//! in the type itself (UINT12 is an unsigned integer with 12 fractional
//! bits), so the same byte run can decode to an integer or a scaled float
//! depending on the nibble.

use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;

use crate::codec::params::param_name;
use crate::constants::MAX_RECORDS;
use crate::error::OpenThingsError;

/// Record region terminator byte.
pub const RECORD_TERMINATOR: u8 = 0x00;

// Wire type nibbles (upper 4 bits of the type/length byte).
pub const TYPE_UINT: u8 = 0x00;
pub const TYPE_UINT4: u8 = 0x10;
pub const TYPE_UINT8: u8 = 0x20;
pub const TYPE_UINT12: u8 = 0x30;
pub const TYPE_UINT16: u8 = 0x40;
pub const TYPE_UINT20: u8 = 0x50;
pub const TYPE_UINT24: u8 = 0x60;
pub const TYPE_CHAR: u8 = 0x70;
pub const TYPE_SINT: u8 = 0x80;
pub const TYPE_SINT8: u8 = 0x90;
pub const TYPE_SINT16: u8 = 0xA0;
pub const TYPE_SINT24: u8 = 0xB0;
/// Reserved in the protocol; no known device transmits it.
pub const TYPE_FLOAT: u8 = 0xF0;

/// Number of fractional bits implied by a wire type nibble.
pub fn binary_point(type_id: u8) -> u32 {
    match type_id {
        TYPE_UINT4 => 4,
        TYPE_UINT8 | TYPE_SINT8 => 8,
        TYPE_UINT12 => 12,
        TYPE_UINT16 | TYPE_SINT16 => 16,
        TYPE_UINT20 => 20,
        TYPE_UINT24 | TYPE_SINT24 => 24,
        _ => 0,
    }
}

/// Decoded record value, classified by how it surfaces in a reading.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// Record carried no value bytes.
    None,
    /// UINT and SINT wire types (SINT sign-extended from its wire width).
    Int(i64),
    /// Fixed-point wire types. `raw` keeps the undivided integer, which
    /// bitmask parameters such as DIAGNOSTICS are read from.
    Float { raw: i64, value: f64 },
    /// CHAR wire type.
    Char(String),
    /// FLOAT and unassigned nibbles; holds the first value byte, surfaced
    /// as an integer.
    Unsupported(i64),
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Raw parameter id including the command bit.
    pub param_id: u8,
    /// Bit 7 of the parameter id: commanded rather than reported.
    pub is_command: bool,
    /// Display name (commands carry an underscore prefix).
    pub name: String,
    /// Wire type nibble.
    pub type_id: u8,
    pub value: RecordValue,
}

impl Record {
    /// Integer view of the value. Fixed-point records yield their raw
    /// undivided integer.
    pub fn as_int(&self) -> i64 {
        match &self.value {
            RecordValue::None | RecordValue::Char(_) => 0,
            RecordValue::Int(v) | RecordValue::Unsupported(v) => *v,
            RecordValue::Float { raw, .. } => *raw,
        }
    }

    /// Value with the wire type's binary point applied. Integer records
    /// from a signed fixed-point type (SINT8/16/24) divide down the same
    /// way fixed-point records do, which is how radiator valves report
    /// temperature.
    pub fn as_float(&self) -> f64 {
        match &self.value {
            RecordValue::None | RecordValue::Char(_) => 0.0,
            RecordValue::Float { value, .. } => *value,
            RecordValue::Int(v) | RecordValue::Unsupported(v) => {
                *v as f64 / f64::from(1u32 << binary_point(self.type_id))
            }
        }
    }
}

/// Big-endian accumulation of up to 8 value bytes.
fn accumulate(data: &[u8]) -> u64 {
    data.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

/// Sign-extend a big-endian accumulated value of `len` bytes.
fn sign_extend(raw: u64, len: usize) -> i64 {
    let shift = 64 - (len as u32 * 8).min(64);
    ((raw << shift) as i64) >> shift
}

fn classify(type_id: u8, data: &[u8]) -> RecordValue {
    if data.is_empty() {
        return RecordValue::None;
    }
    match type_id {
        TYPE_CHAR => RecordValue::Char(String::from_utf8_lossy(data).into_owned()),
        TYPE_UINT => RecordValue::Int(accumulate(data) as i64),
        TYPE_UINT4 | TYPE_UINT8 | TYPE_UINT12 | TYPE_UINT16 | TYPE_UINT20 | TYPE_UINT24 => {
            let raw = accumulate(data) as i64;
            RecordValue::Float {
                raw,
                value: raw as f64 / f64::from(1u32 << binary_point(type_id)),
            }
        }
        TYPE_SINT | TYPE_SINT8 | TYPE_SINT16 | TYPE_SINT24 => {
            RecordValue::Int(sign_extend(accumulate(data), data.len()))
        }
        _ => RecordValue::Unsupported(i64::from(data[0])),
    }
}

/// Parses a single record from the body.
fn parse_record(input: &[u8]) -> IResult<&[u8], Record> {
    let (input, param) = be_u8(input)?;
    let (input, typelen) = be_u8(input)?;
    let type_id = typelen & 0xF0;
    let rlen = usize::from(typelen & 0x0F);
    let (input, data) = take(rlen)(input)?;

    Ok((
        input,
        Record {
            param_id: param,
            is_command: param & 0x80 != 0,
            name: param_name(param),
            type_id,
            value: classify(type_id, data),
        },
    ))
}

/// Parse the record region of a decrypted body.
///
/// Stops at the zero terminator, the end of the region, or after
/// [`MAX_RECORDS`] records. A record whose declared value length runs past
/// the region is malformed and rejects the whole body.
pub fn parse_records(region: &[u8]) -> Result<Vec<Record>, OpenThingsError> {
    let mut records = Vec::new();
    let mut rest = region;

    while let Some(&next) = rest.first() {
        if next == RECORD_TERMINATOR || records.len() >= MAX_RECORDS {
            break;
        }
        let offset = region.len() - rest.len();
        let (remaining, record) = parse_record(rest).map_err(|_| {
            OpenThingsError::RecordParse(format!(
                "record {} at offset {} overruns the body",
                records.len(),
                offset
            ))
        })?;
        records.push(record);
        rest = remaining;
    }

    Ok(records)
}
