//! Decoded readings surfaced to callers.
//!
//! A reading is the flat result of decoding one frame: the header identity
//! fields plus one entry per record, followed by any device-state appendage
//! (valve status, outstanding cached command). Fields keep their insertion
//! order when serialized, and a name may legitimately appear twice — a
//! radiator valve's DIAGNOSTICS record is surfaced once from the wire and
//! once from stored state, and consumers are expected to cope.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::codec::{Record, RecordValue};
use crate::constants::PARAM_TEMPERATURE;

/// One surfaced field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// A decoded frame presented as named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: u32,
    pub mfr_id: u8,
    pub product_id: u8,
    pub timestamp: DateTime<Utc>,
    fields: Vec<(String, Value)>,
}

impl Reading {
    pub fn new(device_id: u32, mfr_id: u8, product_id: u8, timestamp: DateTime<Utc>) -> Self {
        Reading {
            device_id,
            mfr_id,
            product_id,
            timestamp,
            fields: Vec::new(),
        }
    }

    /// Append a named field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Append a decoded record under its parameter name.
    ///
    /// Most values surface as their decoded classification. TEMPERATURE is
    /// the exception: radiator valves report it with an integer wire type,
    /// so it is forced to the fixed-point float view here.
    pub fn push_record(&mut self, record: &Record) {
        let value = match &record.value {
            RecordValue::Char(s) => Value::Text(s.clone()),
            RecordValue::Float { value, .. } => Value::Float(*value),
            RecordValue::None => Value::Int(0),
            RecordValue::Int(v) => {
                if record.param_id == PARAM_TEMPERATURE {
                    Value::Float(record.as_float())
                } else {
                    Value::Int(*v)
                }
            }
            RecordValue::Unsupported(v) => Value::Int(*v),
        };
        self.fields.push((record.name.clone(), value));
    }

    /// First field with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Flat JSON form of the reading.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for Reading {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(4 + self.fields.len()))?;
        map.serialize_entry("deviceId", &self.device_id)?;
        map.serialize_entry("mfrId", &self.mfr_id)?;
        map.serialize_entry("productId", &self.product_id)?;
        map.serialize_entry("timestamp", &self.timestamp.timestamp())?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
