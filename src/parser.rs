//! Record normalization for one device export.
//!
//! Turns raw CSV content into a [`DeviceSeries`]: headers resolved into a
//! [`Schema`], numeric columns coerced, mandatory-field and data-quality
//! preconditions enforced, and rows with unparseable timestamps dropped.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{FileError, ProcessingError};
use crate::schema::{Field, Schema};

/// Cell contents treated as "no value", matched case-insensitively.
const MISSING_TOKENS: &[&str] = &[
    "",
    "nan",
    "-nan",
    "na",
    "n/a",
    "#na",
    "#n/a",
    "#n/a n/a",
    "-1.#ind",
    "1.#ind",
    "-1.#qnan",
    "1.#qnan",
    "null",
    "none",
    "<na>",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%y", "%m/%d/%Y"];

/// Format of bin labels in the output, `MM/DD/YY HH`.
pub const BIN_LABEL_FORMAT: &str = "%m/%d/%y %H";

/// One normalized row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: NaiveDateTime,
    pub values: [Option<f64>; Field::COUNT],
}

impl Sample {
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }
}

/// All usable samples of one device, in file order.
#[derive(Debug, Clone)]
pub struct DeviceSeries {
    pub serial: String,
    pub schema: Schema,
    pub samples: Vec<Sample>,
}

/// Device serial encoded in an export filename: everything before the first `-`.
pub fn device_serial(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('-').next().unwrap_or_default().to_string()
}

fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Coerces a cell for `field`. Carrier bandwidths swallow junk as missing,
/// every other field rejects it.
fn parse_value(field: Field, raw: &str, row: usize) -> Result<Option<f64>, ProcessingError> {
    if is_missing(raw) {
        return Ok(None);
    }
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) if field.is_carrier() => Ok(None),
        Err(_) => Err(ProcessingError::InvalidNumber {
            column: field.column_name(),
            row,
            value: raw.to_string(),
        }),
    }
}

/// Parses a timestamp cell, trying the export formats seen in the field.
/// Offsets are normalized to UTC and then dropped.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts);
    }
    if let Some(ts) = parse_bin_label(raw) {
        return Some(ts);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Renders a bin start as an output label.
pub fn format_bin_label(ts: NaiveDateTime) -> String {
    ts.format(BIN_LABEL_FORMAT).to_string()
}

/// Reads back a label produced by [`format_bin_label`].
pub fn parse_bin_label(label: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{}:00", label.trim()), "%m/%d/%y %H:%M").ok()
}

/// Normalizes one device's CSV content.
///
/// # Errors
///
/// - [`FileError::MissingField`] when `Time`, `DL Capacity` or `RF Utilization` is absent.
/// - [`FileError::AllValuesMissing`] when DL Capacity or RF Utilization has no value on any row.
/// - [`FileError::Processing`] for unreadable or malformed content.
pub fn parse_device_csv<R: Read>(serial: &str, reader: R) -> Result<DeviceSeries, FileError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().map_err(ProcessingError::from)?.clone();
    let schema = Schema::from_headers(&headers);

    for carrier in Field::CARRIERS {
        if !schema.has(carrier) {
            warn!(
                serial,
                field = carrier.column_name(),
                "Carrier bandwidth column missing, treating as all missing"
            );
        }
    }

    let missing = schema.missing_mandatory();
    let (Some(time_idx), true) = (schema.time_column(), missing.is_empty()) else {
        return Err(FileError::MissingField {
            missing,
            found: schema.found().to_vec(),
        });
    };

    let mut raw_rows: Vec<(String, [Option<f64>; Field::COUNT])> = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(ProcessingError::from)?;
        let row = i + 1;
        let mut values = [None; Field::COUNT];
        for field in Field::ALL {
            if let Some(cell) = schema.column(field).and_then(|idx| record.get(idx)) {
                values[field.index()] = parse_value(field, cell, row)?;
            }
        }
        let time = record.get(time_idx).unwrap_or_default().to_string();
        raw_rows.push((time, values));
    }
    debug!(serial, rows = raw_rows.len(), "Read device rows");

    for field in [Field::DlCapacity, Field::RfUtilization] {
        if raw_rows.iter().all(|(_, values)| values[field.index()].is_none()) {
            return Err(FileError::AllValuesMissing {
                field: field.column_name(),
            });
        }
    }

    let total = raw_rows.len();
    let samples: Vec<Sample> = raw_rows
        .into_iter()
        .filter_map(|(time, values)| parse_timestamp(&time).map(|time| Sample { time, values }))
        .collect();

    let dropped = total - samples.len();
    if dropped > 0 {
        warn!(serial, dropped, "Dropped rows with unparseable time");
    }

    Ok(DeviceSeries {
        serial: serial.to_string(),
        schema,
        samples,
    })
}
