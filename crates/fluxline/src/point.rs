//! Data points and their line protocol encoding.
//!
//! Write format:
//!
//! ```text
//! <measurement>[,<tag>=<value>...] <field>=<value>[,<field>=<value>...] [<ns timestamp>]
//! ```
//!
//! Escaping: measurement names escape `,` and space; tag keys and values and
//! field keys escape `,`, `=` and space; string field values escape `"` and
//! `\`; integer fields carry an `i` suffix.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::value::Value;

/// One write event: a tagged, timestamped set of field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, Value>,
    timestamp: Option<DateTime<Utc>>,
}

impl Point {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: None,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set an explicit timestamp. Unset points are stamped by the transport
    /// at write time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Encode as one line of line protocol.
    ///
    /// Rejects points that the engine would reject: empty measurement, empty
    /// tag keys or values, no fields, or a `Null` field value.
    pub fn to_line_protocol(&self) -> Result<String, Error> {
        if self.measurement.is_empty() {
            return Err(Error::InvalidPoint("measurement must not be empty".into()));
        }
        if self.fields.is_empty() {
            return Err(Error::InvalidPoint(format!(
                "point for {:?} has no fields",
                self.measurement
            )));
        }

        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            if key.is_empty() || value.is_empty() {
                return Err(Error::InvalidPoint(format!(
                    "empty tag key or value on {:?}",
                    self.measurement
                )));
            }
            line.push(',');
            line.push_str(&escape_tag(key));
            line.push('=');
            line.push_str(&escape_tag(value));
        }

        line.push(' ');
        let mut first = true;
        for (key, value) in &self.fields {
            if key.is_empty() {
                return Err(Error::InvalidPoint(format!(
                    "empty field key on {:?}",
                    self.measurement
                )));
            }
            if !first {
                line.push(',');
            }
            first = false;
            line.push_str(&escape_tag(key));
            line.push('=');
            match value {
                Value::Integer(v) => {
                    line.push_str(&v.to_string());
                    line.push('i');
                }
                Value::Float(v) => line.push_str(&v.to_string()),
                Value::Text(v) => {
                    line.push('"');
                    line.push_str(&escape_field_string(v));
                    line.push('"');
                }
                Value::Null => {
                    return Err(Error::InvalidPoint(format!(
                        "null value for field {key:?} on {:?}",
                        self.measurement
                    )));
                }
            }
        }

        if let Some(ts) = self.timestamp {
            let nanos = ts.timestamp_nanos_opt().ok_or_else(|| {
                Error::InvalidPoint(format!("timestamp out of range on {:?}", self.measurement))
            })?;
            line.push(' ');
            line.push_str(&nanos.to_string());
        }

        Ok(line)
    }
}

fn escape_measurement(raw: &str) -> String {
    raw.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(raw: &str) -> String {
    raw.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

fn escape_field_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
