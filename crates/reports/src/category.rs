//! The measurement model: the five probe categories and their tag and field
//! vocabularies. Categories are data; the store and synthesizer never branch
//! on a specific category, only on its descriptor.

use serde::{Deserialize, Serialize};

/// A class of monitoring probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Endpoint,
    Ping,
    NetCat,
    TraceRoute,
    PageSpeed,
}

/// Type of a measured field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Text,
}

/// Default query shape for a category.
///
/// Liveness checks are compacted to one value per 10-second bucket for
/// display, so reads without an explicit aggregation get one; generic
/// reports are returned raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    Report,
    Check,
}

/// Vocabulary and query defaults for one category.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    /// Measurement name in the engine.
    pub measurement: &'static str,
    /// Identifying dimensions; a write must supply every one of them.
    pub tag_keys: &'static [&'static str],
    /// Measured values; a write must supply every one of them.
    pub fields: &'static [(&'static str, FieldType)],
    pub shape: QueryShape,
}

impl CategorySpec {
    pub fn has_tag(&self, key: &str) -> bool {
        self.tag_keys.contains(&key)
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, field_type)| *field_type)
    }
}

static ENDPOINT: CategorySpec = CategorySpec {
    measurement: "endpoint",
    tag_keys: &["project_id", "endpoint_name", "pipeline_id", "url", "datacenter_title"],
    fields: &[
        ("success", FieldType::Integer),
        ("response_time", FieldType::Float),
        ("response_body", FieldType::Text),
        ("response_header", FieldType::Text),
        ("response_status", FieldType::Integer),
    ],
    shape: QueryShape::Report,
};

static PING: CategorySpec = CategorySpec {
    measurement: "ping",
    tag_keys: &["project_id", "url"],
    fields: &[("success", FieldType::Integer)],
    shape: QueryShape::Check,
};

static NET_CAT: CategorySpec = CategorySpec {
    measurement: "net_cat",
    tag_keys: &["project_id", "url"],
    fields: &[("success", FieldType::Integer)],
    shape: QueryShape::Check,
};

static TRACE_ROUTE: CategorySpec = CategorySpec {
    measurement: "trace_route",
    tag_keys: &["project_id", "url"],
    fields: &[("success", FieldType::Integer)],
    shape: QueryShape::Check,
};

static PAGE_SPEED: CategorySpec = CategorySpec {
    measurement: "page_speed",
    tag_keys: &["project_id", "url"],
    fields: &[("success", FieldType::Integer), ("load_time", FieldType::Float)],
    shape: QueryShape::Report,
};

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Endpoint,
        Category::Ping,
        Category::NetCat,
        Category::TraceRoute,
        Category::PageSpeed,
    ];

    pub fn spec(&self) -> &'static CategorySpec {
        match self {
            Category::Endpoint => &ENDPOINT,
            Category::Ping => &PING,
            Category::NetCat => &NET_CAT,
            Category::TraceRoute => &TRACE_ROUTE,
            Category::PageSpeed => &PAGE_SPEED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.spec().measurement
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Text => write!(f, "string"),
        }
    }
}
