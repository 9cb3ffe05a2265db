//! Annotated CSV response decoder.
//!
//! The engine answers Flux queries as annotated CSV: a `#datatype` row
//! naming each column's type, a header row naming the columns, then data
//! rows. Every row starts with an empty annotation cell; an empty line ends
//! a table and the next table restates its annotations. Cells may be quoted
//! with `"` and embed quotes as `""`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::client::Row;
use crate::error::Error;
use crate::value::Value;

/// Columns produced by the engine itself rather than the stored series.
const SYSTEM_COLUMNS: &[&str] = &["result", "table", "_start", "_stop", "_measurement"];

pub(crate) fn decode_annotated_csv(body: &str) -> Result<Vec<Row>, Error> {
    let mut rows = Vec::new();
    let mut datatypes: Vec<String> = Vec::new();
    let mut header: Vec<String> = Vec::new();

    for (index, line) in body.lines().enumerate() {
        let lineno = index + 1;
        let line = line.trim_end_matches('\r');

        if line.is_empty() {
            // Table separator; the next table restates its annotations.
            datatypes.clear();
            header.clear();
            continue;
        }

        let cells = split_line(line, lineno)?;
        if let Some(annotation) = cells.first().filter(|c| c.starts_with('#')) {
            if annotation == "#datatype" {
                datatypes = cells[1..].to_vec();
            }
            // #group and #default carry nothing we consume.
            continue;
        }

        if header.is_empty() {
            header = cells[1..].to_vec();
            continue;
        }

        if cells.len() != header.len() + 1 {
            return Err(Error::Decode {
                line: lineno,
                message: format!(
                    "expected {} cells, found {}",
                    header.len() + 1,
                    cells.len()
                ),
            });
        }

        rows.push(decode_row(&header, &datatypes, &cells[1..], lineno)?);
    }

    Ok(rows)
}

fn decode_row(
    header: &[String],
    datatypes: &[String],
    cells: &[String],
    lineno: usize,
) -> Result<Row, Error> {
    let mut time = None;
    let mut field = String::new();
    let mut value = Value::Null;
    let mut tags = BTreeMap::new();

    for (index, (column, raw)) in header.iter().zip(cells).enumerate() {
        match column.as_str() {
            "_time" => {
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| Error::Decode {
                    line: lineno,
                    message: format!("bad _time {raw:?}: {e}"),
                })?;
                time = Some(parsed.with_timezone(&Utc));
            }
            "_field" => field = raw.clone(),
            "_value" => {
                let datatype =
                    datatypes.get(index).map(String::as_str).unwrap_or("string");
                value = decode_value(raw, datatype, lineno)?;
            }
            name if SYSTEM_COLUMNS.contains(&name) => {}
            name => {
                tags.insert(name.to_string(), raw.clone());
            }
        }
    }

    let time = time.ok_or(Error::Decode {
        line: lineno,
        message: "row has no _time column".into(),
    })?;

    Ok(Row { time, field, value, tags })
}

fn decode_value(raw: &str, datatype: &str, lineno: usize) -> Result<Value, Error> {
    // Empty buckets from createEmpty windows arrive as empty cells.
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    let parse_err = |message: String| Error::Decode { line: lineno, message };
    match datatype {
        "long" | "unsignedLong" => raw
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| parse_err(format!("bad integer {raw:?}: {e}"))),
        "double" => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| parse_err(format!("bad float {raw:?}: {e}"))),
        "boolean" => match raw {
            "true" => Ok(Value::Integer(1)),
            "false" => Ok(Value::Integer(0)),
            other => Err(parse_err(format!("bad boolean {other:?}"))),
        },
        _ => Ok(Value::Text(raw.to_string())),
    }
}

/// Split one CSV line into cells, honoring quoting.
fn split_line(line: &str, lineno: usize) -> Result<Vec<String>, Error> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => quoted = false,
                _ => current.push(c),
            }
        } else {
            match c {
                '"' if current.is_empty() => quoted = true,
                ',' => {
                    cells.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }
    }

    if quoted {
        return Err(Error::Decode {
            line: lineno,
            message: "unterminated quoted cell".into(),
        });
    }

    cells.push(current);
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "\
#datatype,string,long,dateTime:RFC3339,string,double,string,string\n\
,result,table,_time,_field,_value,project_id,url\n\
,_result,0,2026-08-06T10:00:00Z,response_time,0.42,7,https://example.com\n\
,_result,0,2026-08-06T10:00:10Z,response_time,0.51,7,https://example.com\n";

    #[test]
    fn test_decodes_rows_in_order() {
        let rows = decode_annotated_csv(BODY).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field, "response_time");
        assert_eq!(rows[0].value, Value::Float(0.42));
        assert_eq!(rows[0].tags["project_id"], "7");
        assert!(rows[0].time < rows[1].time);
    }

    #[test]
    fn test_types_follow_datatype_annotation() {
        let body = "\
#datatype,string,long,dateTime:RFC3339,string,long\n\
,result,table,_time,_field,_value\n\
,_result,0,2026-08-06T10:00:00Z,success,1\n";
        let rows = decode_annotated_csv(body).unwrap();
        assert_eq!(rows[0].value, Value::Integer(1));
    }

    #[test]
    fn test_empty_value_is_null() {
        let body = "\
#datatype,string,long,dateTime:RFC3339,string,double\n\
,result,table,_time,_field,_value\n\
,_result,0,2026-08-06T10:00:00Z,success,\n";
        let rows = decode_annotated_csv(body).unwrap();
        assert_eq!(rows[0].value, Value::Null);
    }

    #[test]
    fn test_quoted_cells_with_commas_and_quotes() {
        let body = "\
#datatype,string,long,dateTime:RFC3339,string,string\n\
,result,table,_time,_field,_value\n\
,_result,0,2026-08-06T10:00:00Z,response_body,\"a,b \"\"c\"\"\"\n";
        let rows = decode_annotated_csv(body).unwrap();
        assert_eq!(rows[0].value, Value::Text("a,b \"c\"".into()));
    }

    #[test]
    fn test_multiple_tables_reset_annotations() {
        let body = "\
#datatype,string,long,dateTime:RFC3339,string,long\n\
,result,table,_time,_field,_value\n\
,_result,0,2026-08-06T10:00:00Z,success,1\n\
\n\
#datatype,string,long,dateTime:RFC3339,string,double\n\
,result,table,_time,_field,_value\n\
,_result,1,2026-08-06T10:00:00Z,response_time,0.2\n";
        let rows = decode_annotated_csv(body).unwrap();
        assert_eq!(rows[0].value, Value::Integer(1));
        assert_eq!(rows[1].value, Value::Float(0.2));
    }

    #[test]
    fn test_missing_time_column_is_an_error() {
        let body = "\
#datatype,string,long,string,long\n\
,result,table,_field,_value\n\
,_result,0,success,1\n";
        let err = decode_annotated_csv(body).unwrap_err();
        assert!(matches!(err, Error::Decode { line: 3, .. }));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let body = "\
#datatype,string,long,dateTime:RFC3339,string,long\n\
,result,table,_time,_field,_value\n\
,_result,0,2026-08-06T10:00:00Z,success\n";
        assert!(decode_annotated_csv(body).is_err());
    }

    #[test]
    fn test_empty_body_decodes_to_no_rows() {
        assert!(decode_annotated_csv("").unwrap().is_empty());
        assert!(decode_annotated_csv("\r\n\r\n").unwrap().is_empty());
    }
}
