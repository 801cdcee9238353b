//! Fixed-width time binning of a device series.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::debug;

use crate::analyzers::types::AggregatedBin;
use crate::analyzers::utility::{max, mean, round3, to_count};
use crate::config::Frequency;
use crate::parser::{DeviceSeries, Sample};
use crate::schema::{Field, Reduction};

/// Buckets `series` into calendar-aligned bins of width `frequency` and
/// reduces each bin.
///
/// Bins span from the bin holding the earliest sample to the bin holding the
/// latest one; bins with no samples in between are emitted with every value
/// missing. An empty series yields no bins.
pub fn resample(series: &DeviceSeries, frequency: Frequency) -> Vec<AggregatedBin> {
    let mut buckets: BTreeMap<NaiveDateTime, Vec<&Sample>> = BTreeMap::new();
    for sample in &series.samples {
        buckets
            .entry(frequency.floor(sample.time))
            .or_default()
            .push(sample);
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        debug!(serial = %series.serial, "No samples to aggregate");
        return Vec::new();
    };

    let mut bins = Vec::new();
    let mut start = first;
    while start <= last {
        let samples = buckets.get(&start).map(Vec::as_slice).unwrap_or_default();
        bins.push(reduce_bin(series, start, samples));
        match frequency.next(start) {
            Some(next) => start = next,
            None => break,
        }
    }

    debug!(
        serial = %series.serial,
        ?frequency,
        samples = series.samples.len(),
        bins = bins.len(),
        "Aggregated device series"
    );
    bins
}

fn reduce_bin(series: &DeviceSeries, start: NaiveDateTime, samples: &[&Sample]) -> AggregatedBin {
    let mut reduced = [None; Field::COUNT];
    for field in Field::ALL {
        if !series.schema.has(field) {
            continue;
        }
        let values: Vec<Option<f64>> = samples.iter().map(|s| s.get(field)).collect();
        reduced[field.index()] = match field.reduction() {
            Reduction::Mean => mean(&values),
            Reduction::Max => max(&values),
        };
    }

    let measure = |field: Field| reduced[field.index()].map(round3);
    let count = |field: Field| reduced[field.index()].map(to_count);

    let mut bin = AggregatedBin::empty(&series.serial, start);
    bin.dl_capacity = measure(Field::DlCapacity);
    bin.ul_capacity = measure(Field::UlCapacity);
    bin.rf_utilization = measure(Field::RfUtilization);
    bin.dl_rate = measure(Field::DlRate);
    bin.ul_rate = measure(Field::UlRate);
    bin.dl_peak_rate = measure(Field::DlPeakRate);
    bin.ul_peak_rate = measure(Field::UlPeakRate);
    bin.active_connections = count(Field::ActiveConnections);
    bin.carriers = Field::CARRIERS.map(count);
    bin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_device_csv;
    use chrono::NaiveDate;

    fn ts(m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn series(content: &str) -> DeviceSeries {
        parse_device_csv("s200", content.as_bytes()).unwrap()
    }

    #[test]
    fn test_same_hour_rows_are_averaged() {
        let s = series(
            "Time,DL Capacity,RF Utilization\n\
             2024-03-14 09:10:00,10,0.2\n\
             2024-03-14 09:50:00,20,0.4\n",
        );
        let bins = resample(&s, Frequency::Hour);

        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].start, ts(3, 14, 9));
        assert_eq!(bins[0].serial, "s200");
        assert_eq!(bins[0].dl_capacity, Some(15.0));
        assert_eq!(bins[0].rf_utilization, Some(0.3));
    }

    #[test]
    fn test_gaps_become_empty_bins() {
        let s = series(
            "Time,DL Capacity,RF Utilization,Active Connections\n\
             2024-03-14 09:10:00,10,0.2,4\n\
             2024-03-14 12:05:00,30,0.6,7\n",
        );
        let bins = resample(&s, Frequency::Hour);

        let starts: Vec<_> = bins.iter().map(|b| b.start).collect();
        assert_eq!(
            starts,
            vec![ts(3, 14, 9), ts(3, 14, 10), ts(3, 14, 11), ts(3, 14, 12)]
        );
        assert_eq!(bins[1], AggregatedBin::empty("s200", ts(3, 14, 10)));
        assert_eq!(bins[3].active_connections, Some(7));
    }

    #[test]
    fn test_max_fields_and_counts() {
        let s = series(
            "Time,DL Capacity,RF Utilization,DL Peak Rate,Active Connections,\"Bandwidth, Carrier 0\"\n\
             2024-03-14 09:10:00,10,0.2,100.12345,3,20\n\
             2024-03-14 09:20:00,10,0.2,99,5.9,40\n\
             2024-03-14 09:30:00,10,0.2,,,\n",
        );
        let bins = resample(&s, Frequency::Hour);

        assert_eq!(bins[0].dl_peak_rate, Some(100.123));
        assert_eq!(bins[0].active_connections, Some(5));
        assert_eq!(bins[0].carriers, [Some(40), None, None, None]);
    }

    #[test]
    fn test_absent_optional_fields_stay_missing() {
        let s = series("Time,DL Capacity,RF Utilization\n2024-03-14 09:10:00,10,0.2\n");
        let bins = resample(&s, Frequency::Hour);

        assert_eq!(bins[0].ul_capacity, None);
        assert_eq!(bins[0].active_connections, None);
        assert_eq!(bins[0].carriers[2], None);
    }

    #[test]
    fn test_capacity_is_rounded() {
        let s = series(
            "Time,DL Capacity,RF Utilization\n\
             2024-03-14 09:10:00,1,0.1\n\
             2024-03-14 09:20:00,1,0.1\n\
             2024-03-14 09:30:00,2,0.1\n",
        );
        let bins = resample(&s, Frequency::Hour);
        assert_eq!(bins[0].dl_capacity, Some(1.333));
    }

    #[test]
    fn test_daily_and_monthly_bins() {
        let s = series(
            "Time,DL Capacity,RF Utilization\n\
             2024-01-31 23:10:00,10,0.1\n\
             2024-02-01 01:00:00,20,0.1\n\
             2024-03-15 08:00:00,30,0.1\n",
        );

        let daily = resample(&s, Frequency::Day);
        assert_eq!(daily.first().map(|b| b.start), Some(ts(1, 31, 0)));
        assert_eq!(daily.last().map(|b| b.start), Some(ts(3, 15, 0)));
        assert_eq!(daily.len(), 45);

        let monthly = resample(&s, Frequency::Month);
        let starts: Vec<_> = monthly.iter().map(|b| b.start).collect();
        assert_eq!(starts, vec![ts(1, 1, 0), ts(2, 1, 0), ts(3, 1, 0)]);
        assert_eq!(monthly[1].dl_capacity, Some(20.0));
    }

    #[test]
    fn test_unsorted_input_is_binned_chronologically() {
        let s = series(
            "Time,DL Capacity,RF Utilization\n\
             2024-03-14 11:00:00,30,0.1\n\
             2024-03-14 10:00:00,20,0.1\n",
        );
        let bins = resample(&s, Frequency::Hour);
        assert_eq!(bins[0].start, ts(3, 14, 10));
        assert_eq!(bins[1].dl_capacity, Some(30.0));
    }

    #[test]
    fn test_empty_series_yields_no_bins() {
        let s = series("Time,DL Capacity,RF Utilization\nbad,10,0.1\n");
        assert!(resample(&s, Frequency::Hour).is_empty());
    }
}
