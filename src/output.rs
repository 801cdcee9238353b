//! CSV output of aggregated bins.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::{AggregatedBin, OutputRecord};
use crate::schema::OUTPUT_COLUMNS;

/// Writes the header and one row per bin to `writer`.
pub fn write_bins<W: Write>(writer: W, bins: &[AggregatedBin]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    writer.write_record(OUTPUT_COLUMNS)?;
    for bin in bins {
        writer.serialize(OutputRecord::from(bin))?;
    }
    writer.flush()?;

    debug!(rows = bins.len(), "Wrote CSV rows");
    Ok(())
}

/// Writes bins to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, bins: &[AggregatedBin]) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            write_bins(file, bins)?;
            info!(path = %path.display(), rows = bins.len(), "Output aggregated data");
        }
        None => {
            write_bins(std::io::stdout().lock(), bins)?;
            info!(rows = bins.len(), "Output aggregated data to stdout");
        }
    }
    Ok(())
}
