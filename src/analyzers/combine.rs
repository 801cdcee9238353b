//! Cross-device merge and final validity gate.

use tracing::debug;

use crate::analyzers::types::AggregatedBin;

/// All surviving bins of a run. Built once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedDataset {
    bins: Vec<AggregatedBin>,
}

impl CombinedDataset {
    pub fn bins(&self) -> &[AggregatedBin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

fn zero_as_missing(count: Option<i64>) -> Option<i64> {
    count.filter(|&c| c != 0)
}

/// Concatenates per-file bins in the given order, drops bins lacking DL
/// Capacity or RF Utilization, and applies the zero-count policy.
///
/// With `zero_counts_as_missing` set, a carrier bandwidth or active
/// connection count of 0 is reported as missing.
pub fn combine(per_file: Vec<Vec<AggregatedBin>>, zero_counts_as_missing: bool) -> CombinedDataset {
    let total: usize = per_file.iter().map(Vec::len).sum();

    let bins: Vec<AggregatedBin> = per_file
        .into_iter()
        .flatten()
        .filter(AggregatedBin::is_valid)
        .map(|bin| {
            if !zero_counts_as_missing {
                return bin;
            }
            AggregatedBin {
                active_connections: zero_as_missing(bin.active_connections),
                carriers: bin.carriers.map(zero_as_missing),
                ..bin
            }
        })
        .collect();

    debug!(
        total,
        kept = bins.len(),
        dropped = total - bins.len(),
        "Combined device bins"
    );
    CombinedDataset { bins }
}
