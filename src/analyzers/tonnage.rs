//! Traffic volume derived from capacity.

use crate::analyzers::types::AggregatedBin;
use crate::analyzers::utility::round3;

/// Seconds in the hour over which a capacity rate is integrated.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Bits per byte times 1000, taking megabit rates to gigabytes.
const MEGABITS_PER_GIGABYTE: f64 = 8000.0;

/// Gigabytes carried in one hour at `capacity`, rounded to 3 decimals.
pub fn tonnage_gb(capacity: f64) -> f64 {
    round3((capacity * SECONDS_PER_HOUR) / MEGABITS_PER_GIGABYTE)
}

/// Fills the DL and UL tonnage of every bin from its capacities.
pub fn with_tonnage(bins: Vec<AggregatedBin>) -> Vec<AggregatedBin> {
    bins.into_iter()
        .map(|bin| AggregatedBin {
            dl_tonnage_gb: bin.dl_capacity.map(tonnage_gb),
            ul_tonnage_gb: bin.ul_capacity.map(tonnage_gb),
            ..bin
        })
        .collect()
}
