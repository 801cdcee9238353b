//! Known input columns and how each one is reduced inside a bin.
//!
//! Column presence is resolved once per file into a [`Schema`], so later
//! stages ask "is this field present" against a fixed capability set instead
//! of re-probing header names.

use csv::StringRecord;

/// Name of the mandatory timestamp column.
pub const TIME_COLUMN: &str = "Time";

/// Columns that must exist for a file to be processed at all.
pub const MANDATORY_COLUMNS: [&str; 3] = [TIME_COLUMN, "DL Capacity", "RF Utilization"];

/// Output header, in emission order.
pub const OUTPUT_COLUMNS: [&str; 16] = [
    "Device Serial",
    "Time",
    "RF Utilization",
    "DL Tonnage GB",
    "UL Tonnage GB",
    "DL Capacity",
    "UL Capacity",
    "DL Rate",
    "UL Rate",
    "DL Peak Rate",
    "UL Peak Rate",
    "Active Connections",
    "Bandwidth, Carrier 0",
    "Bandwidth, Carrier 1",
    "Bandwidth, Carrier 2",
    "Bandwidth, Carrier 3",
];

/// Reduction applied to the samples falling in one bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Mean,
    Max,
}

/// A numeric input field the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    DlCapacity,
    UlCapacity,
    RfUtilization,
    DlRate,
    UlRate,
    ActiveConnections,
    DlPeakRate,
    UlPeakRate,
    Carrier0,
    Carrier1,
    Carrier2,
    Carrier3,
}

impl Field {
    pub const COUNT: usize = 12;

    pub const ALL: [Field; Field::COUNT] = [
        Field::DlCapacity,
        Field::UlCapacity,
        Field::RfUtilization,
        Field::DlRate,
        Field::UlRate,
        Field::ActiveConnections,
        Field::DlPeakRate,
        Field::UlPeakRate,
        Field::Carrier0,
        Field::Carrier1,
        Field::Carrier2,
        Field::Carrier3,
    ];

    pub const CARRIERS: [Field; 4] = [
        Field::Carrier0,
        Field::Carrier1,
        Field::Carrier2,
        Field::Carrier3,
    ];

    /// Column header as it appears in device exports.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::DlCapacity => "DL Capacity",
            Field::UlCapacity => "UL Capacity",
            Field::RfUtilization => "RF Utilization",
            Field::DlRate => "DL Rate",
            Field::UlRate => "UL Rate",
            Field::ActiveConnections => "Active Connections",
            Field::DlPeakRate => "DL Peak Rate",
            Field::UlPeakRate => "UL Peak Rate",
            Field::Carrier0 => "Bandwidth, Carrier 0",
            Field::Carrier1 => "Bandwidth, Carrier 1",
            Field::Carrier2 => "Bandwidth, Carrier 2",
            Field::Carrier3 => "Bandwidth, Carrier 3",
        }
    }

    /// Fixed per-field reduction; not configurable.
    pub fn reduction(self) -> Reduction {
        match self {
            Field::DlCapacity
            | Field::UlCapacity
            | Field::RfUtilization
            | Field::DlRate
            | Field::UlRate => Reduction::Mean,
            Field::ActiveConnections
            | Field::DlPeakRate
            | Field::UlPeakRate
            | Field::Carrier0
            | Field::Carrier1
            | Field::Carrier2
            | Field::Carrier3 => Reduction::Max,
        }
    }

    /// Carrier bandwidths tolerate junk values: anything non-numeric is missing.
    pub fn is_carrier(self) -> bool {
        Self::CARRIERS.contains(&self)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Header capability set for one input file.
#[derive(Debug, Clone)]
pub struct Schema {
    time: Option<usize>,
    columns: [Option<usize>; Field::COUNT],
    found: Vec<String>,
}

impl Schema {
    /// Resolves known fields against a header row. Names are trimmed and
    /// matched case-insensitively.
    pub fn from_headers(headers: &StringRecord) -> Self {
        let found: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let position = |wanted: &str| {
            let wanted = normalize_header(wanted);
            found.iter().position(|h| normalize_header(h) == wanted)
        };

        let mut columns = [None; Field::COUNT];
        for field in Field::ALL {
            columns[field.index()] = position(field.column_name());
        }

        Self {
            time: position(TIME_COLUMN),
            columns,
            found,
        }
    }

    pub fn time_column(&self) -> Option<usize> {
        self.time
    }

    pub fn column(&self, field: Field) -> Option<usize> {
        self.columns[field.index()]
    }

    pub fn has(&self, field: Field) -> bool {
        self.column(field).is_some()
    }

    /// Mandatory columns that the header lacks.
    pub fn missing_mandatory(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.time.is_none() {
            missing.push(TIME_COLUMN);
        }
        for field in [Field::DlCapacity, Field::RfUtilization] {
            if !self.has(field) {
                missing.push(field.column_name());
            }
        }
        missing
    }

    /// Trimmed header names as found in the file.
    pub fn found(&self) -> &[String] {
        &self.found
    }
}
