//! Data types shared by the aggregation stages.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::parser::format_bin_label;

/// One fixed-width time bin of one device, after reduction.
///
/// Counts (active connections, carrier bandwidths) are integers and stay
/// optional end to end; whether a zero is reported as missing is decided by
/// the combiner.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedBin {
    pub serial: String,
    pub start: NaiveDateTime,
    pub rf_utilization: Option<f64>,
    pub dl_capacity: Option<f64>,
    pub ul_capacity: Option<f64>,
    pub dl_rate: Option<f64>,
    pub ul_rate: Option<f64>,
    pub dl_peak_rate: Option<f64>,
    pub ul_peak_rate: Option<f64>,
    pub active_connections: Option<i64>,
    pub carriers: [Option<i64>; 4],
    pub dl_tonnage_gb: Option<f64>,
    pub ul_tonnage_gb: Option<f64>,
}

impl AggregatedBin {
    /// A bin with every value missing.
    pub fn empty(serial: &str, start: NaiveDateTime) -> Self {
        Self {
            serial: serial.to_string(),
            start,
            rf_utilization: None,
            dl_capacity: None,
            ul_capacity: None,
            dl_rate: None,
            ul_rate: None,
            dl_peak_rate: None,
            ul_peak_rate: None,
            active_connections: None,
            carriers: [None; 4],
            dl_tonnage_gb: None,
            ul_tonnage_gb: None,
        }
    }

    /// Both core measurements are present.
    pub fn is_valid(&self) -> bool {
        self.dl_capacity.is_some() && self.rf_utilization.is_some()
    }
}

/// Output row, serialized in the fixed column order.
#[derive(Debug, Serialize)]
pub struct OutputRecord<'a> {
    #[serde(rename = "Device Serial")]
    pub device_serial: &'a str,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "RF Utilization")]
    pub rf_utilization: Option<f64>,
    #[serde(rename = "DL Tonnage GB")]
    pub dl_tonnage_gb: Option<f64>,
    #[serde(rename = "UL Tonnage GB")]
    pub ul_tonnage_gb: Option<f64>,
    #[serde(rename = "DL Capacity")]
    pub dl_capacity: Option<f64>,
    #[serde(rename = "UL Capacity")]
    pub ul_capacity: Option<f64>,
    #[serde(rename = "DL Rate")]
    pub dl_rate: Option<f64>,
    #[serde(rename = "UL Rate")]
    pub ul_rate: Option<f64>,
    #[serde(rename = "DL Peak Rate")]
    pub dl_peak_rate: Option<f64>,
    #[serde(rename = "UL Peak Rate")]
    pub ul_peak_rate: Option<f64>,
    #[serde(rename = "Active Connections")]
    pub active_connections: Option<i64>,
    #[serde(rename = "Bandwidth, Carrier 0")]
    pub carrier_0: Option<i64>,
    #[serde(rename = "Bandwidth, Carrier 1")]
    pub carrier_1: Option<i64>,
    #[serde(rename = "Bandwidth, Carrier 2")]
    pub carrier_2: Option<i64>,
    #[serde(rename = "Bandwidth, Carrier 3")]
    pub carrier_3: Option<i64>,
}

impl<'a> From<&'a AggregatedBin> for OutputRecord<'a> {
    fn from(bin: &'a AggregatedBin) -> Self {
        let [carrier_0, carrier_1, carrier_2, carrier_3] = bin.carriers;
        Self {
            device_serial: &bin.serial,
            time: format_bin_label(bin.start),
            rf_utilization: bin.rf_utilization,
            dl_tonnage_gb: bin.dl_tonnage_gb,
            ul_tonnage_gb: bin.ul_tonnage_gb,
            dl_capacity: bin.dl_capacity,
            ul_capacity: bin.ul_capacity,
            dl_rate: bin.dl_rate,
            ul_rate: bin.ul_rate,
            dl_peak_rate: bin.dl_peak_rate,
            ul_peak_rate: bin.ul_peak_rate,
            active_connections: bin.active_connections,
            carrier_0,
            carrier_1,
            carrier_2,
            carrier_3,
        }
    }
}
