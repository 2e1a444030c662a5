use axum::http::{HeaderMap, header};
use bbdata_common::dates;
use chrono::{TimeZone, Utc};

use crate::entity::{aggregation, raw_value};
use crate::models::values::{AggregationRow, RawValueRow};

pub const RAW_CSV_HEADER: &str = "object_id,timestamp,value,comment";
pub const AGGREGATION_CSV_HEADER: &str =
    "object_id,timestamp,last,last_timestamp,min,max,sum,mean,std,count,comment";

/// Output encoding of a values response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
}

impl Format {
    /// CSV when `Accept` (or, without it, `Content-Type`) mentions `text`.
    pub fn negotiate(headers: &HeaderMap) -> Self {
        let wanted = headers
            .get(header::ACCEPT)
            .or_else(|| headers.get(header::CONTENT_TYPE))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json");
        if wanted.contains("text") {
            Format::Csv
        } else {
            Format::Json
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Csv => "text/csv; charset=utf-8",
        }
    }
}

/// A time-series row that can be written in both encodings.
pub trait Row {
    fn to_json(&self) -> Result<String, serde_json::Error>;

    fn to_csv(&self) -> String;
}

impl Row for raw_value::Model {
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&RawValueRow {
            timestamp: dates::format(&self.timestamp),
            value: self.value.clone(),
            comment: self.comment.clone(),
        })
    }

    fn to_csv(&self) -> String {
        [
            self.object_id.to_string(),
            dates::format(&self.timestamp),
            csv_field(&self.value),
            self.comment.as_deref().map(csv_field).unwrap_or_default(),
        ]
        .join(",")
    }
}

impl Row for aggregation::Model {
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&AggregationRow {
            timestamp: dates::format(&self.timestamp),
            last: self.last,
            last_timestamp: self.last_ts.and_then(format_millis),
            min: self.min,
            max: self.max,
            sum: self.sum,
            mean: self.mean.map(round5),
            std: self.std.filter(|s| s.is_finite()),
            count: self.count,
            comment: self.comment.clone(),
        })
    }

    fn to_csv(&self) -> String {
        let num = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        [
            self.object_id.to_string(),
            dates::format(&self.timestamp),
            num(self.last),
            self.last_ts.and_then(format_millis).unwrap_or_default(),
            num(self.min),
            num(self.max),
            num(self.sum),
            num(self.mean.map(round5)),
            num(self.std.filter(|s| s.is_finite())),
            self.count.to_string(),
            self.comment.as_deref().map(csv_field).unwrap_or_default(),
        ]
        .join(",")
    }
}

pub fn round5(v: f64) -> f64 {
    (v * 100_000.0).round() / 100_000.0
}

fn format_millis(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|d| dates::format(&d))
}

/// Quote a field when it holds a separator, a quote or a line break.
pub fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
