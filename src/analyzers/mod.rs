//! Per-device aggregation and cross-device selection.
//!
//! Each input file is normalized, binned and given tonnage figures
//! independently; the surviving series are then combined and, on request,
//! reduced to the busiest bin per device and calendar period.

pub mod analyzer;
pub mod busiest;
pub mod combine;
pub mod resample;
pub mod tonnage;
pub mod types;
pub mod utility;
