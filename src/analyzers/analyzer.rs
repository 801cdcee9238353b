use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn};

use crate::analyzers::busiest::{BusiestSelection, file_busiest, select_busiest};
use crate::analyzers::combine::combine;
use crate::analyzers::resample::resample;
use crate::analyzers::tonnage::with_tonnage;
use crate::analyzers::types::AggregatedBin;
use crate::config::{Frequency, RunConfig};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{FileError, ProcessingError};
use crate::output::write_output;
use crate::parser::{device_serial, parse_device_csv};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Rows were written to the output target.
    Written { rows: usize },
    /// No file survived validation; nothing was written.
    NoResults,
    /// Busiest mode found no (device, period) groups.
    NoBusiestBins,
    /// Busiest mode hit an invalid group and suppressed the whole output.
    BusiestSuppressed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub files_found: usize,
    pub files_used: usize,
    pub files_skipped: usize,
    pub outcome: RunOutcome,
}

/// Lists files in `dir` matching `pattern`, sorted by path. Glob
/// metacharacters in `dir` itself are matched literally.
pub fn discover_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = Path::new(&escaped).join(pattern);
    let full = full.to_string_lossy();
    let mut files = Vec::new();

    for entry in glob::glob(&full).with_context(|| format!("invalid file pattern {full}"))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Unreadable path while discovering files"),
        }
    }

    files.sort();
    Ok(files)
}

/// Normalizes, bins and derives tonnage for one device export.
pub fn process_file(path: &Path, frequency: Frequency) -> Result<Vec<AggregatedBin>, FileError> {
    let serial = device_serial(path);
    info!(path = %path.display(), serial = %serial, "Processing file");

    let file = File::open(path).map_err(ProcessingError::from)?;
    let series = parse_device_csv(&serial, file)?;
    let bins = with_tonnage(resample(&series, frequency));

    info!(path = %path.display(), bins = bins.len(), "Finished processing file");
    Ok(bins)
}

type FileResult = (PathBuf, Result<Vec<AggregatedBin>, FileError>);

/// Runs [`process_file`] over every path with at most `concurrency` files in
/// flight. Results come back in input order.
async fn process_all(
    paths: Vec<PathBuf>,
    frequency: Frequency,
    concurrency: usize,
) -> Result<Vec<FileResult>> {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = Vec::with_capacity(paths.len());

    for path in paths {
        let permit = semaphore.clone().acquire_owned().await?;
        let span = info_span!(
            "process_file",
            path = %path.display(),
            serial = %device_serial(&path)
        );

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = span.in_scope(|| process_file(&path, frequency));
            (path, result)
        });
        tasks.push(task);
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(task.await?);
    }
    Ok(results)
}

/// Processes every discovered file, combines the survivors and writes either
/// the full aggregation or the busiest selection.
///
/// Per-file failures are reported to `sink` and never abort the run. Errors
/// returned here are run-level: bad pattern, worker failure, unwritable output.
#[tracing::instrument(skip(config, sink), fields(input_dir = %config.input_dir.display(), pattern = %config.pattern))]
pub async fn run(config: &RunConfig, sink: &dyn DiagnosticSink) -> Result<RunSummary> {
    config.validate()?;
    info!("Run started");

    let files = discover_files(&config.input_dir, &config.pattern)?;
    let files_found = files.len();
    info!(files_found, "Found files to process");

    let results = process_all(files, config.frequency, config.concurrency).await?;

    let mut accepted = Vec::new();
    let mut files_skipped = 0;
    for (path, result) in results {
        let bins = match result {
            Ok(bins) => bins,
            Err(e) => {
                files_skipped += 1;
                sink.report(Diagnostic::skipped(path, &e));
                continue;
            }
        };

        if config.busiest.is_some() {
            match file_busiest(&bins) {
                Ok(best) if best.is_valid() => {}
                Ok(_) => {
                    files_skipped += 1;
                    sink.report(Diagnostic::FileDiscarded {
                        path,
                        reason: "busiest bin has missing DL Capacity or RF Utilization".into(),
                    });
                    continue;
                }
                Err(e) => {
                    files_skipped += 1;
                    sink.report(Diagnostic::skipped(path, &e));
                    continue;
                }
            }
        }

        debug!(path = %path.display(), bins = bins.len(), "Appended file results");
        accepted.push(bins);
    }

    let files_used = accepted.len();
    let summary = |outcome| RunSummary {
        files_found,
        files_used,
        files_skipped,
        outcome,
    };

    if accepted.is_empty() {
        sink.report(Diagnostic::Notice("No results to combine and output".into()));
        return Ok(summary(RunOutcome::NoResults));
    }

    let combined = combine(accepted, config.zero_counts_as_missing);
    let output = config.output.as_deref();

    let Some(period) = config.busiest else {
        write_output(output, combined.bins())?;
        return Ok(summary(RunOutcome::Written {
            rows: combined.len(),
        }));
    };

    match select_busiest(combined.bins(), period, config.busiest_validity) {
        BusiestSelection::NoGroups => {
            sink.report(Diagnostic::Notice(format!(
                "No busiest bins found for period: {period}"
            )));
            Ok(summary(RunOutcome::NoBusiestBins))
        }
        BusiestSelection::Suppressed { invalid_groups } => {
            sink.report(Diagnostic::Notice(format!(
                "Skipped busiest output for period {period}: {} group(s) have missing DL Capacity or RF Utilization",
                invalid_groups.len()
            )));
            Ok(summary(RunOutcome::BusiestSuppressed))
        }
        BusiestSelection::Selected {
            bins,
            dropped_groups,
        } => {
            for (serial, start) in dropped_groups {
                sink.report(Diagnostic::Notice(format!(
                    "Dropped busiest bin for device {serial}, {period} starting {start}: missing DL Capacity or RF Utilization"
                )));
            }
            write_output(output, &bins)?;
            info!(%period, rows = bins.len(), "Output busiest bins");
            Ok(summary(RunOutcome::Written { rows: bins.len() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusiestPeriod;
    use crate::diagnostics::MemorySink;
    use std::fs;

    const HEADER: &str = "Time,DL Capacity,RF Utilization";

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn config(dir: &Path) -> RunConfig {
        RunConfig {
            input_dir: dir.to_path_buf(),
            output: Some(dir.join("out.csv")),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_discover_files_matches_pattern_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s2-b.csv", HEADER);
        write(dir.path(), "s1-a.csv", HEADER);
        write(dir.path(), "other.csv", HEADER);
        write(dir.path(), "s3-c.txt", HEADER);

        let files = discover_files(dir.path(), "s*-*.csv").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["s1-a.csv", "s2-b.csv"]);
    }

    #[test]
    fn test_discover_files_in_dir_with_glob_characters() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("run[1]*?");
        fs::create_dir(&dir).unwrap();
        write(&dir, "s1-a.csv", HEADER);
        // would match "run1" if the brackets were read as a character class
        fs::create_dir(root.path().join("run1")).unwrap();
        write(&root.path().join("run1"), "s2-b.csv", HEADER);

        let files = discover_files(&dir, "s*-*.csv").unwrap();
        assert_eq!(files, vec![dir.join("s1-a.csv")]);
    }

    #[test]
    fn test_process_file_scenario() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "s9-perf.csv",
            "Time,DL Capacity,RF Utilization\n\
             2024-03-14 09:10:00,10,0.5\n\
             2024-03-14 09:50:00,20,0.5\n",
        );

        let bins = process_file(&dir.path().join("s9-perf.csv"), Frequency::Hour).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].serial, "s9");
        assert_eq!(bins[0].dl_capacity, Some(15.0));
        assert_eq!(bins[0].dl_tonnage_gb, Some(6.75));
    }

    #[test]
    fn test_process_missing_file_is_processing_error() {
        let err = process_file(Path::new("/nonexistent/s1-x.csv"), Frequency::Hour).unwrap_err();
        assert!(matches!(err, FileError::Processing(ProcessingError::Io(_))));
    }

    #[tokio::test]
    async fn test_bad_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s1-ok.csv", "Time,DL Capacity,RF Utilization\n2024-03-14 09:10:00,10,0.5\n");
        write(dir.path(), "s2-nofield.csv", "Time,DL Capacity\n2024-03-14 09:10:00,10\n");
        write(dir.path(), "s3-empty.csv", "Time,DL Capacity,RF Utilization\n2024-03-14 09:10:00,,0.5\n");

        let sink = MemorySink::new();
        let summary = run(&config(dir.path()), &sink).await.unwrap();

        assert_eq!(summary.files_found, 3);
        assert_eq!(summary.files_used, 1);
        assert_eq!(summary.files_skipped, 2);
        assert_eq!(summary.outcome, RunOutcome::Written { rows: 1 });

        let kinds: Vec<_> = sink
            .entries()
            .into_iter()
            .filter_map(|d| match d {
                Diagnostic::FileSkipped { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec!["missing_field", "all_values_missing"]);
    }

    #[tokio::test]
    async fn test_no_valid_files_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s1-bad.csv", "Time,RF Utilization\n");

        let sink = MemorySink::new();
        let cfg = config(dir.path());
        let summary = run(&cfg, &sink).await.unwrap();

        assert_eq!(summary.outcome, RunOutcome::NoResults);
        assert!(!dir.path().join("out.csv").exists());
        assert!(sink.entries().contains(&Diagnostic::Notice(
            "No results to combine and output".into()
        )));
    }

    #[tokio::test]
    async fn test_busiest_precheck_discards_file() {
        let dir = tempfile::tempdir().unwrap();
        // busiest hour (10:00) has capacity but no utilization
        write(
            dir.path(),
            "s1-a.csv",
            "Time,DL Capacity,RF Utilization\n\
             2024-03-14 09:10:00,10,0.5\n\
             2024-03-14 10:10:00,90,\n",
        );
        write(dir.path(), "s2-b.csv", "Time,DL Capacity,RF Utilization\n2024-03-14 09:10:00,10,0.5\n");

        let sink = MemorySink::new();
        let cfg = RunConfig {
            busiest: Some(BusiestPeriod::Day),
            ..config(dir.path())
        };
        let summary = run(&cfg, &sink).await.unwrap();

        assert_eq!(summary.files_used, 1);
        assert_eq!(summary.outcome, RunOutcome::Written { rows: 1 });
        assert!(matches!(
            &sink.entries()[0],
            Diagnostic::FileDiscarded { path, .. } if path.ends_with("s1-a.csv")
        ));

        let out = fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert!(out.lines().nth(1).unwrap().starts_with("s2,03/14/24 09,"));
    }

    #[tokio::test]
    async fn test_concurrent_run_keeps_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=6 {
            write(
                dir.path(),
                &format!("s{i}-x.csv"),
                "Time,DL Capacity,RF Utilization\n2024-03-14 09:10:00,10,0.5\n",
            );
        }

        let sink = MemorySink::new();
        let cfg = RunConfig {
            concurrency: 3,
            ..config(dir.path())
        };
        run(&cfg, &sink).await.unwrap();

        let out = fs::read_to_string(dir.path().join("out.csv")).unwrap();
        let serials: Vec<_> = out
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap().to_string())
            .collect();
        assert_eq!(serials, vec!["s1", "s2", "s3", "s4", "s5", "s6"]);
    }
}
