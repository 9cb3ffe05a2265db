//! Report points: one probe outcome, ready to be written.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fluxline::{Point, Value};

use crate::category::{Category, FieldType};
use crate::error::ValidationError;

/// One write event for a category.
///
/// Setters are infallible; the store validates the point against the
/// category vocabulary before it goes anywhere near the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPoint {
    category: Category,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, Value>,
    timestamp: Option<DateTime<Utc>>,
}

impl ReportPoint {
    pub fn new(category: Category) -> Self {
        Self {
            category,
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

    /// Set an explicit timestamp; unset points are stamped at write time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Check the point against its category's vocabulary: every declared
    /// tag present and non-empty, every declared field present with the
    /// declared type, nothing undeclared.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let spec = self.category.spec();

        for key in self.tags.keys() {
            if !spec.has_tag(key) {
                return Err(ValidationError::UnknownTag {
                    category: self.category,
                    key: key.clone(),
                });
            }
        }
        for key in spec.tag_keys {
            match self.tags.get(*key) {
                None => {
                    return Err(ValidationError::MissingTag {
                        category: self.category,
                        key: (*key).to_string(),
                    });
                }
                Some(value) if value.is_empty() => {
                    return Err(ValidationError::EmptyTag { key: (*key).to_string() });
                }
                Some(_) => {}
            }
        }

        for name in self.fields.keys() {
            if spec.field_type(name).is_none() {
                return Err(ValidationError::UnknownField {
                    category: self.category,
                    name: name.clone(),
                });
            }
        }
        for (name, field_type) in spec.fields {
            let Some(value) = self.fields.get(*name) else {
                return Err(ValidationError::MissingField {
                    category: self.category,
                    name: (*name).to_string(),
                });
            };
            let matches = matches!(
                (field_type, value),
                (FieldType::Integer, Value::Integer(_))
                    | (FieldType::Float, Value::Float(_))
                    | (FieldType::Float, Value::Integer(_))
                    | (FieldType::Text, Value::Text(_))
            );
            if !matches {
                return Err(ValidationError::FieldType {
                    name: (*name).to_string(),
                    expected: *field_type,
                    actual: value.type_name(),
                });
            }
        }

        Ok(())
    }

    /// Lower into the engine's point shape. Integer values headed for a
    /// float field are widened so the series keeps one type.
    pub(crate) fn to_point(&self) -> Point {
        let spec = self.category.spec();
        let mut point = Point::new(spec.measurement);
        for (key, value) in &self.tags {
            point = point.tag(key.as_str(), value.as_str());
        }
        for (name, value) in &self.fields {
            let value = match (spec.field_type(name), value) {
                (Some(FieldType::Float), Value::Integer(v)) => Value::Float(*v as f64),
                _ => value.clone(),
            };
            point = point.field(name.as_str(), value);
        }
        if let Some(timestamp) = self.timestamp {
            point = point.at(timestamp);
        }
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping_point() -> ReportPoint {
        ReportPoint::new(Category::Ping)
            .tag("project_id", "7")
            .tag("url", "https://example.com")
            .field("success", 1)
    }

    #[test]
    fn test_complete_point_validates() {
        assert_eq!(ping_point().validate(), Ok(()));
    }

    #[test]
    fn test_missing_tag_is_rejected() {
        let point = ReportPoint::new(Category::Ping)
            .tag("project_id", "7")
            .field("success", 1);
        assert_eq!(
            point.validate(),
            Err(ValidationError::MissingTag { category: Category::Ping, key: "url".into() })
        );
    }

    #[test]
    fn test_empty_tag_value_is_rejected() {
        let point = ping_point().tag("url", "");
        assert_eq!(point.validate(), Err(ValidationError::EmptyTag { key: "url".into() }));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let point = ping_point().tag("datacenter_title", "fra1");
        assert!(matches!(point.validate(), Err(ValidationError::UnknownTag { .. })));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let point = ping_point().field("response_time", 0.5);
        assert!(matches!(point.validate(), Err(ValidationError::UnknownField { .. })));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let point = ReportPoint::new(Category::Ping)
            .tag("project_id", "7")
            .tag("url", "https://example.com");
        assert!(matches!(point.validate(), Err(ValidationError::MissingField { .. })));
    }

    #[test]
    fn test_field_type_mismatch_is_rejected() {
        let point = ping_point().field("success", "yes");
        assert_eq!(
            point.validate(),
            Err(ValidationError::FieldType {
                name: "success".into(),
                expected: FieldType::Integer,
                actual: "string",
            })
        );
    }

    #[test]
    fn test_integers_widen_into_float_fields() {
        let point = ReportPoint::new(Category::Endpoint)
            .tag("project_id", "7")
            .tag("endpoint_name", "api")
            .tag("pipeline_id", "3")
            .tag("url", "https://example.com")
            .tag("datacenter_title", "fra1")
            .field("success", 1)
            .field("response_time", 2)
            .field("response_body", "ok")
            .field("response_header", "content-type: text/plain")
            .field("response_status", 200);
        assert_eq!(point.validate(), Ok(()));
        let lowered = point.to_point();
        assert_eq!(lowered.fields()["response_time"], Value::Float(2.0));
        assert_eq!(lowered.fields()["success"], Value::Integer(1));
    }
}
