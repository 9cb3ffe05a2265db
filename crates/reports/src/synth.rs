//! Query synthesis: one deterministic Flux script per filter spec.
//!
//! Clause rules:
//! - tag filters are ANDed, field filters are ORed; either clause is omitted
//!   entirely when empty,
//! - Check-shape categories get an implicit 10s `last` window when the
//!   filter requests no aggregation; Report-shape categories never get an
//!   implicit window,
//! - an aggregate clause (explicit or implicit) ends the script with a
//!   `yield` named after the function,
//! - `limit` is emitted only for a positive limit and always carries the
//!   offset; an offset without a limit does nothing.
//!
//! Identical specs synthesize byte-identical scripts: tag filters iterate in
//! key order and every interpolated value is escaped or comes from a
//! validated vocabulary.

use fluxline::Duration;
use fluxline::script::string_literal;

use crate::category::QueryShape;
use crate::filter::{Aggregate, AggregateFn, ReportFilter};

/// Width of the implicit window applied to liveness-check reads.
const CHECK_WINDOW_SECONDS: u64 = 10;

pub fn synthesize(bucket: &str, filter: &ReportFilter) -> String {
    let mut script = format!("from(bucket: {})", string_literal(bucket));
    let mut push = |clause: String| {
        script.push_str("\n  |> ");
        script.push_str(&clause);
    };

    push(format!("range(start: -{})", filter.range()));
    push(format!(
        "filter(fn: (r) => r[\"_measurement\"] == {})",
        string_literal(filter.category().as_str())
    ));

    if !filter.tags().is_empty() {
        let predicate = filter
            .tags()
            .iter()
            .map(|(key, value)| {
                format!("r[{}] == {}", string_literal(key), string_literal(value))
            })
            .collect::<Vec<_>>()
            .join(" and ");
        push(format!("filter(fn: (r) => {predicate})"));
    }

    if !filter.fields().is_empty() {
        let predicate = filter
            .fields()
            .iter()
            .map(|name| format!("r[\"_field\"] == {}", string_literal(name)))
            .collect::<Vec<_>>()
            .join(" or ");
        push(format!("filter(fn: (r) => {predicate})"));
    }

    let implicit_window;
    let aggregate = match (filter.aggregate(), filter.category().spec().shape) {
        (Some(aggregate), _) => Some(aggregate),
        (None, QueryShape::Check) => {
            implicit_window = Aggregate {
                func: AggregateFn::Last,
                every: Duration::seconds(CHECK_WINDOW_SECONDS),
                create_empty: false,
            };
            Some(&implicit_window)
        }
        (None, QueryShape::Report) => None,
    };

    if let Some(aggregate) = aggregate {
        push(format!(
            "aggregateWindow(every: {}, fn: {}, createEmpty: {})",
            aggregate.every,
            aggregate.func.as_str(),
            aggregate.create_empty
        ));
    }

    if filter.pivot() {
        push(
            "pivot(rowKey: [\"_time\"], columnKey: [\"_field\"], valueColumn: \"_value\")"
                .to_string(),
        );
    }

    if filter.limit() > 0 {
        push(format!("limit(n: {}, offset: {})", filter.limit(), filter.offset()));
    }

    if let Some(aggregate) = aggregate {
        push(format!("yield(name: {})", string_literal(aggregate.func.as_str())));
    }

    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::filter::ReportFilter;

    #[test]
    fn test_full_endpoint_query() {
        let filter = ReportFilter::builder(Category::Endpoint, "24h")
            .tag("project_id", "7")
            .tag("endpoint_name", "api")
            .field("success")
            .field("response_time")
            .aggregate(AggregateFn::Mean, "1m")
            .create_empty()
            .pivot()
            .limit(100, 20)
            .build()
            .unwrap();

        assert_eq!(
            synthesize("reports", &filter),
            "from(bucket: \"reports\")\n  \
             |> range(start: -24h)\n  \
             |> filter(fn: (r) => r[\"_measurement\"] == \"endpoint\")\n  \
             |> filter(fn: (r) => r[\"endpoint_name\"] == \"api\" and r[\"project_id\"] == \"7\")\n  \
             |> filter(fn: (r) => r[\"_field\"] == \"success\" or r[\"_field\"] == \"response_time\")\n  \
             |> aggregateWindow(every: 1m, fn: mean, createEmpty: true)\n  \
             |> pivot(rowKey: [\"_time\"], columnKey: [\"_field\"], valueColumn: \"_value\")\n  \
             |> limit(n: 100, offset: 20)\n  \
             |> yield(name: \"mean\")"
        );
    }

    #[test]
    fn test_endpoint_default_has_no_aggregation() {
        let filter = ReportFilter::builder(Category::Endpoint, "10m").build().unwrap();
        let script = synthesize("reports", &filter);
        assert_eq!(
            script,
            "from(bucket: \"reports\")\n  \
             |> range(start: -10m)\n  \
             |> filter(fn: (r) => r[\"_measurement\"] == \"endpoint\")"
        );
    }

    #[test]
    fn test_check_default_gets_ten_second_last_window() {
        let filter = ReportFilter::builder(Category::Ping, "10m").build().unwrap();
        let script = synthesize("reports", &filter);
        assert_eq!(
            script,
            "from(bucket: \"reports\")\n  \
             |> range(start: -10m)\n  \
             |> filter(fn: (r) => r[\"_measurement\"] == \"ping\")\n  \
             |> aggregateWindow(every: 10s, fn: last, createEmpty: false)\n  \
             |> yield(name: \"last\")"
        );
    }

    #[test]
    fn test_explicit_aggregation_overrides_check_default() {
        let filter = ReportFilter::builder(Category::Ping, "1h")
            .aggregate(AggregateFn::Mean, "5m")
            .build()
            .unwrap();
        let script = synthesize("reports", &filter);
        assert!(script.contains("aggregateWindow(every: 5m, fn: mean, createEmpty: false)"));
        assert!(script.contains("yield(name: \"mean\")"));
        assert!(!script.contains("10s"));
    }

    #[test]
    fn test_zero_limit_never_emits_limit_clause() {
        let filter = ReportFilter::builder(Category::Endpoint, "10m")
            .limit(0, 50)
            .build()
            .unwrap();
        assert!(!synthesize("reports", &filter).contains("limit"));
    }

    #[test]
    fn test_quote_bearing_tag_value_stays_a_literal() {
        let filter = ReportFilter::builder(Category::Ping, "10m")
            .tag("project_id", "7\" or true//")
            .build()
            .unwrap();
        let script = synthesize("reports", &filter);
        assert!(script.contains(r#"r["project_id"] == "7\" or true//""#));
        // Quotes stay balanced: every quote in the script is either a
        // delimiter or escaped, so the hostile value cannot close the
        // literal and graft a predicate on.
        let unescaped = script.replace("\\\"", "");
        assert_eq!(unescaped.matches('"').count() % 2, 0);
    }

    #[test]
    fn test_identical_specs_synthesize_identical_scripts() {
        let build = || {
            ReportFilter::builder(Category::TraceRoute, "30m")
                .tag("url", "example.com")
                .tag("project_id", "9")
                .field("success")
                .build()
                .unwrap()
        };
        assert_eq!(synthesize("reports", &build()), synthesize("reports", &build()));
    }

    #[test]
    fn test_hostile_bucket_name_is_escaped() {
        let filter = ReportFilter::builder(Category::Ping, "10m").build().unwrap();
        let script = synthesize("b\"x", &filter);
        assert!(script.starts_with("from(bucket: \"b\\\"x\")"));
    }
}
