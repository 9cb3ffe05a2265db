//! Declarative read specification: what a report query wants, validated
//! against the category vocabulary before anything is synthesized.

use std::collections::BTreeMap;

use fluxline::Duration;

use crate::category::Category;
use crate::error::ValidationError;

/// Aggregation functions the engine is allowed to run. A closed set: query
/// synthesis interpolates the function name, so it never comes from a raw
/// caller string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Last,
    Mean,
    Max,
    Min,
    Sum,
    Count,
}

impl AggregateFn {
    /// Parse a caller-supplied name, rejecting anything off the allow-list.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        match name {
            "last" => Ok(AggregateFn::Last),
            "mean" => Ok(AggregateFn::Mean),
            "max" => Ok(AggregateFn::Max),
            "min" => Ok(AggregateFn::Min),
            "sum" => Ok(AggregateFn::Sum),
            "count" => Ok(AggregateFn::Count),
            other => Err(ValidationError::UnknownAggregate(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFn::Last => "last",
            AggregateFn::Mean => "mean",
            AggregateFn::Max => "max",
            AggregateFn::Min => "min",
            AggregateFn::Sum => "sum",
            AggregateFn::Count => "count",
        }
    }
}

impl std::fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A windowed aggregation: reduce each `every` bucket with `func`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub func: AggregateFn,
    pub every: Duration,
    /// Emit a row (with a null value) for buckets containing no points.
    pub create_empty: bool,
}

/// A validated read request for one category.
///
/// Construct through [`ReportFilter::builder`]; an instance existing means
/// its tags, fields, range and aggregation all passed vocabulary checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFilter {
    category: Category,
    range: Duration,
    tags: BTreeMap<String, String>,
    fields: Vec<String>,
    aggregate: Option<Aggregate>,
    pivot: bool,
    limit: u32,
    offset: u32,
}

impl ReportFilter {
    pub fn builder(category: Category, range: impl Into<String>) -> FilterBuilder {
        FilterBuilder {
            category,
            range: range.into(),
            tags: Vec::new(),
            fields: Vec::new(),
            aggregate: None,
            create_empty: false,
            pivot: false,
            limit: 0,
            offset: 0,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn range(&self) -> &Duration {
        &self.range
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn aggregate(&self) -> Option<&Aggregate> {
        self.aggregate.as_ref()
    }

    pub fn pivot(&self) -> bool {
        self.pivot
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Layer mandatory tag equality filters over this spec, for scoped
    /// reads. Scope values win over caller-supplied filters on the same key.
    pub(crate) fn scoped(
        &self,
        scope: &[(&str, String)],
    ) -> Result<ReportFilter, ValidationError> {
        let mut filter = self.clone();
        let spec = self.category.spec();
        for (key, value) in scope {
            if !spec.has_tag(key) {
                return Err(ValidationError::UnknownTag {
                    category: self.category,
                    key: (*key).to_string(),
                });
            }
            filter.tags.insert((*key).to_string(), value.clone());
        }
        Ok(filter)
    }
}

/// Builder for [`ReportFilter`]; `build` runs all validation.
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    category: Category,
    range: String,
    tags: Vec<(String, String)>,
    fields: Vec<String>,
    aggregate: Option<(AggregateFn, String)>,
    create_empty: bool,
    pivot: bool,
    limit: u32,
    offset: u32,
}

impl FilterBuilder {
    /// Require an exact tag value. Multiple tags are ANDed together.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Restrict results to the named field. Multiple fields are ORed
    /// together: a record matching any of them passes.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    /// Reduce each `every` bucket with `func`.
    pub fn aggregate(mut self, func: AggregateFn, every: impl Into<String>) -> Self {
        self.aggregate = Some((func, every.into()));
        self
    }

    /// With an aggregation set, also emit rows for empty buckets.
    pub fn create_empty(mut self) -> Self {
        self.create_empty = true;
        self
    }

    /// Reshape long-format rows into one row per timestamp, one column per
    /// field.
    pub fn pivot(mut self) -> Self {
        self.pivot = true;
        self
    }

    /// Paginate the result rows. A zero limit disables pagination; an
    /// offset without a limit is a no-op.
    pub fn limit(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn build(self) -> Result<ReportFilter, ValidationError> {
        let spec = self.category.spec();

        let range = Duration::parse(&self.range)
            .map_err(|_| ValidationError::InvalidRange(self.range.clone()))?;

        let mut tags = BTreeMap::new();
        for (key, value) in self.tags {
            if !spec.has_tag(&key) {
                return Err(ValidationError::UnknownTag { category: self.category, key });
            }
            tags.insert(key, value);
        }

        let mut fields: Vec<String> = Vec::with_capacity(self.fields.len());
        for name in self.fields {
            if spec.field_type(&name).is_none() {
                return Err(ValidationError::UnknownField { category: self.category, name });
            }
            if !fields.contains(&name) {
                fields.push(name);
            }
        }

        let aggregate = match self.aggregate {
            Some((func, every)) => {
                let every = Duration::parse(&every)
                    .map_err(|_| ValidationError::InvalidWindow(every.clone()))?;
                Some(Aggregate { func, every, create_empty: self.create_empty })
            }
            None => None,
        };

        Ok(ReportFilter {
            category: self.category,
            range,
            tags,
            fields,
            aggregate,
            pivot: self.pivot,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_vocabulary() {
        let filter = ReportFilter::builder(Category::Endpoint, "24h")
            .tag("project_id", "7")
            .tag("endpoint_name", "api")
            .field("success")
            .field("response_time")
            .aggregate(AggregateFn::Mean, "1m")
            .pivot()
            .limit(100, 20)
            .build()
            .unwrap();

        assert_eq!(filter.tags().len(), 2);
        assert_eq!(filter.fields(), ["success", "response_time"]);
        assert_eq!(filter.aggregate().unwrap().func, AggregateFn::Mean);
        assert!(!filter.aggregate().unwrap().create_empty);
    }

    #[test]
    fn test_rejects_unknown_tag() {
        let err = ReportFilter::builder(Category::Ping, "10m")
            .tag("endpoint_name", "api")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownTag { category: Category::Ping, key: "endpoint_name".into() }
        );
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = ReportFilter::builder(Category::Ping, "10m")
            .field("response_time")
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));
    }

    #[test]
    fn test_rejects_malformed_range() {
        for bad in ["", "0s", "yesterday", "-10m"] {
            let err = ReportFilter::builder(Category::Ping, bad).build().unwrap_err();
            assert_eq!(err, ValidationError::InvalidRange(bad.to_string()));
        }
    }

    #[test]
    fn test_rejects_malformed_window() {
        let err = ReportFilter::builder(Category::Ping, "10m")
            .aggregate(AggregateFn::Last, "0s")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidWindow("0s".into()));
    }

    #[test]
    fn test_aggregate_names() {
        assert_eq!(AggregateFn::from_name("mean").unwrap(), AggregateFn::Mean);
        assert_eq!(AggregateFn::from_name("count").unwrap(), AggregateFn::Count);
        for bad in ["", "avg", "MEAN", "drop table"] {
            assert!(matches!(
                AggregateFn::from_name(bad),
                Err(ValidationError::UnknownAggregate(_))
            ));
        }
    }

    #[test]
    fn test_duplicate_fields_collapse_in_order() {
        let filter = ReportFilter::builder(Category::Endpoint, "1h")
            .field("response_time")
            .field("success")
            .field("response_time")
            .build()
            .unwrap();
        assert_eq!(filter.fields(), ["response_time", "success"]);
    }

    #[test]
    fn test_scoped_rejects_foreign_keys() {
        let filter = ReportFilter::builder(Category::Ping, "10m").build().unwrap();
        assert!(filter.scoped(&[("project_id", "7".into())]).is_ok());
        assert!(matches!(
            filter.scoped(&[("pipeline_id", "3".into())]),
            Err(ValidationError::UnknownTag { .. })
        ));
    }

    #[test]
    fn test_scope_overrides_caller_tag() {
        let filter = ReportFilter::builder(Category::Ping, "10m")
            .tag("project_id", "1")
            .build()
            .unwrap();
        let scoped = filter.scoped(&[("project_id", "7".into())]).unwrap();
        assert_eq!(scoped.tags()["project_id"], "7");
    }
}
