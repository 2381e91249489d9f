//! W2 text file ingestion.
//!
//! Input files start with a fixed number of header lines followed by one
//! sample per line: a Julian day and a value, separated by whitespace
//! and/or commas. Extra columns are ignored.

use crate::constants::INPUT_EXTENSIONS;
use crate::error::{ExportError, Result};
use crate::models::Sample;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Parse the data section of a W2 file into samples.
///
/// The first `header_lines` lines are skipped and blank lines are ignored.
/// The first line that fails to parse aborts the whole file.
pub fn parse_series<I, S>(lines: I, header_lines: usize) -> Result<Vec<Sample>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut samples = Vec::new();

    for (index, line) in lines.into_iter().enumerate().skip(header_lines) {
        let line = line.as_ref();
        let normalized = line.trim().replace(',', " ");
        if normalized.is_empty() {
            continue;
        }

        let malformed = |reason: String| ExportError::MalformedRecord {
            line_number: index + 1,
            line: line.to_string(),
            reason,
        };

        let mut fields = normalized.split_whitespace();
        let julian_day = parse_field(fields.next(), "Julian day").map_err(malformed)?;
        let value = parse_field(fields.next(), "value").map_err(malformed)?;

        samples.push(Sample { julian_day, value });
    }

    Ok(samples)
}

fn parse_field(field: Option<&str>, name: &str) -> std::result::Result<f64, String> {
    let field = field.ok_or_else(|| format!("missing {} column", name))?;
    field
        .parse::<f64>()
        .map_err(|e| format!("{} '{}' is not a number: {}", name, field, e))
}

/// Read and parse a single W2 file
pub async fn read_series_file(path: &Path, header_lines: usize) -> Result<Vec<Sample>> {
    let content = tokio::fs::read_to_string(path).await?;
    let samples = parse_series(content.lines(), header_lines)?;
    debug!("Parsed {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

/// Outcome of ingesting one file
#[derive(Debug)]
pub struct IngestedFile {
    pub path: PathBuf,
    pub samples: Result<Vec<Sample>>,
}

/// Read files concurrently, at most `workers` at a time.
///
/// Results come back sorted by path; a failing file does not affect the
/// others.
pub async fn ingest_files(
    paths: &[PathBuf],
    header_lines: usize,
    workers: usize,
) -> Vec<IngestedFile> {
    let mut ingested: Vec<IngestedFile> = stream::iter(paths)
        .map(|path| async move {
            let samples = read_series_file(path, header_lines).await;
            if let Err(e) = &samples {
                warn!("Failed to ingest {}: {}", path.display(), e);
            }
            IngestedFile {
                path: path.clone(),
                samples,
            }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    ingested.sort_by(|a, b| a.path.cmp(&b.path));
    ingested
}

/// Expand input arguments into a sorted, de-duplicated list of files.
///
/// Each argument may be a file, a directory (walked recursively for known
/// W2 extensions) or a glob pattern.
pub fn discover_input_files(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            for entry in WalkDir::new(path) {
                let entry = entry.map_err(|e| {
                    ExportError::configuration(format!("cannot walk {}: {}", input, e))
                })?;
                if entry.file_type().is_file() && has_input_extension(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            let matches = glob::glob(input).map_err(|e| {
                ExportError::configuration(format!("invalid input pattern '{}': {}", input, e))
            })?;
            let before = files.len();
            for entry in matches {
                match entry {
                    Ok(found) if found.is_file() => files.push(found),
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable path: {}", e),
                }
            }
            if files.len() == before {
                warn!("No input files matched '{}'", input);
            }
        }
    }

    files.sort();
    files.dedup();
    debug!("Discovered {} input files", files.len());
    Ok(files)
}

fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            INPUT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const QIN_BR1: &str = "$DeGray Reservoir inflow, branch 1\n\
                           \n\
                           JDAY      QIN\n\
                           1.000    21.50\n\
                           1.500    22.75\n\
                           2.000,   23.00\n";

    #[test]
    fn test_parse_whitespace_and_commas() {
        let samples = parse_series(QIN_BR1.lines(), 3).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].julian_day, 1.0);
        assert_eq!(samples[1].value, 22.75);
        assert_eq!(samples[2].julian_day, 2.0);
        assert_eq!(samples[2].value, 23.0);
    }

    #[test]
    fn test_parse_csv_variant_with_extra_columns() {
        let lines = ["JDAY,QIN,QIN2", "x", "x", "367.25,4.0,99", " 367.5 , 5.0 "];
        let samples = parse_series(lines, 3).unwrap();
        assert_eq!(
            samples,
            vec![
                Sample {
                    julian_day: 367.25,
                    value: 4.0
                },
                Sample {
                    julian_day: 367.5,
                    value: 5.0
                },
            ]
        );
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let lines = ["h1", "h2", "h3", "1.0 2.0", "", "   ", "2.0 3.0"];
        assert_eq!(parse_series(lines, 3).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_non_numeric_day_names_line() {
        let lines = ["h1", "h2", "h3", "1.0 2.0", "day2 3.0"];
        let err = parse_series(lines, 3).unwrap_err();
        match err {
            ExportError::MalformedRecord {
                line_number, line, ..
            } => {
                assert_eq!(line_number, 5);
                assert_eq!(line, "day2 3.0");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_missing_value_column() {
        let lines = ["h1", "h2", "h3", "1.0"];
        let err = parse_series(lines, 3).unwrap_err();
        assert!(err.to_string().contains("missing value column"));
    }

    #[test]
    fn test_header_longer_than_file() {
        let lines = ["h1", "h2"];
        assert!(parse_series(lines, 3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_files_isolates_failures() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("qin_br1.npt");
        let bad = temp_dir.path().join("qwo_31.opt");
        let missing = temp_dir.path().join("missing.npt");
        fs::write(&good, QIN_BR1).unwrap();
        fs::write(&bad, "h\nh\nh\n1.0 2.0\nbad 3.0\n").unwrap();

        let ingested = ingest_files(&[bad.clone(), good.clone(), missing.clone()], 3, 2).await;

        assert_eq!(ingested.len(), 3);
        let outcome = |path: &PathBuf| ingested.iter().find(|f| &f.path == path).unwrap();
        assert_eq!(outcome(&good).samples.as_ref().unwrap().len(), 3);
        assert!(matches!(
            outcome(&bad).samples,
            Err(ExportError::MalformedRecord { .. })
        ));
        assert!(matches!(outcome(&missing).samples, Err(ExportError::Io(_))));
    }

    #[test]
    fn test_discover_input_files() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("DeGray");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("qin_br1.npt"), QIN_BR1).unwrap();
        fs::write(nested.join("qwo_31.opt"), QIN_BR1).unwrap();
        fs::write(nested.join("notes.md"), "ignored").unwrap();

        let dir_arg = temp_dir.path().to_string_lossy().to_string();
        let files = discover_input_files(&[dir_arg.clone()]).unwrap();
        assert_eq!(files.len(), 2);

        let pattern = format!("{}/DeGray/*.npt", dir_arg);
        let files = discover_input_files(&[pattern, dir_arg]).unwrap();
        assert_eq!(files.len(), 2);
    }
}
