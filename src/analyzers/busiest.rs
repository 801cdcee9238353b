//! Busiest-bin selection by downlink tonnage.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::debug;

use crate::analyzers::types::AggregatedBin;
use crate::config::{BusiestPeriod, BusiestValidity};
use crate::error::FileError;

/// A (device serial, period start) pair.
pub type GroupKey = (String, NaiveDateTime);

/// Result of reducing a dataset to one bin per device and period.
#[derive(Debug, Clone, PartialEq)]
pub enum BusiestSelection {
    /// The dataset had no bins, so there were no groups.
    NoGroups,
    /// At least one selected bin was invalid and the policy suppresses everything.
    Suppressed { invalid_groups: Vec<GroupKey> },
    /// Selected bins ordered by serial then period; `dropped_groups` lists
    /// invalid groups left out under the per-group policy.
    Selected {
        bins: Vec<AggregatedBin>,
        dropped_groups: Vec<GroupKey>,
    },
}

/// True when `candidate` should replace `best`: strictly more tonnage, or
/// equal tonnage at an earlier start. Bins without tonnage never rank.
fn outranks(candidate: &AggregatedBin, best: &AggregatedBin) -> bool {
    match (candidate.dl_tonnage_gb, best.dl_tonnage_gb) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(c), Some(b)) => c > b || (c == b && candidate.start < best.start),
    }
}

fn pick<'a>(bins: impl IntoIterator<Item = &'a AggregatedBin>) -> Option<&'a AggregatedBin> {
    bins.into_iter().fold(None, |best, bin| match best {
        Some(best) if !outranks(bin, best) => Some(best),
        _ => Some(bin),
    })
}

/// Single busiest bin of one file, ignoring calendar periods.
///
/// # Errors
///
/// [`FileError::Selection`] when no bin carries a downlink tonnage.
pub fn file_busiest(bins: &[AggregatedBin]) -> Result<&AggregatedBin, FileError> {
    pick(bins)
        .filter(|bin| bin.dl_tonnage_gb.is_some())
        .ok_or_else(|| FileError::Selection {
            reason: format!("no bin with DL Tonnage GB among {} bins", bins.len()),
        })
}

/// Picks the busiest bin of every (device, period) group.
///
/// A selected bin lacking DL Capacity or RF Utilization is invalid. With
/// [`BusiestValidity::SuppressAll`] one invalid group suppresses the whole
/// selection; with [`BusiestValidity::PerGroup`] only that group is dropped.
pub fn select_busiest(
    bins: &[AggregatedBin],
    period: BusiestPeriod,
    validity: BusiestValidity,
) -> BusiestSelection {
    let mut groups: BTreeMap<GroupKey, Vec<&AggregatedBin>> = BTreeMap::new();
    for bin in bins {
        groups
            .entry((bin.serial.clone(), period.start_of(bin.start)))
            .or_default()
            .push(bin);
    }

    if groups.is_empty() {
        return BusiestSelection::NoGroups;
    }

    let mut selected = Vec::with_capacity(groups.len());
    let mut invalid_groups = Vec::new();
    for (key, members) in groups {
        match pick(members) {
            Some(bin) if bin.is_valid() => selected.push(bin.clone()),
            _ => invalid_groups.push(key),
        }
    }

    debug!(
        %period,
        selected = selected.len(),
        invalid = invalid_groups.len(),
        "Selected busiest bins"
    );

    match validity {
        BusiestValidity::SuppressAll if !invalid_groups.is_empty() => {
            BusiestSelection::Suppressed { invalid_groups }
        }
        _ => BusiestSelection::Selected {
            bins: selected,
            dropped_groups: invalid_groups,
        },
    }
}
