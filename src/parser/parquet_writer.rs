use super::cleanup::cleanup_chunks;
use crate::config::ResolvedConfig;
use crate::constants::TEMP_CHUNK_PREFIX;
use crate::errors::{AppError, AppResult};
use crate::models::{ConversionSummary, FlatRecord};
use crate::utils::{format_duration, throughput_mb_s};
use polars::functions::concat_df_diagonal;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts a batch of flat records into a Polars DataFrame.
///
/// The column set is the union of the keys seen in this batch, in sorted
/// order; records lacking a key contribute a null. All values stay strings —
/// typing the columns is the consumer's concern.
fn records_to_dataframe(records: &[FlatRecord]) -> AppResult<DataFrame> {
    let mut keys: BTreeSet<&String> = BTreeSet::new();
    for record in records {
        keys.extend(record.keys());
    }

    let mut columns = Vec::with_capacity(keys.len());
    for key in keys {
        let values: Vec<Option<String>> = records.iter().map(|r| r.get(key).cloned()).collect();
        columns.push(Series::new(key, values));
    }

    DataFrame::new(columns)
        .map_err(|e| AppError::WriteError(format!("Failed to create DataFrame: {e}")))
}

/// Writes one batch as an intermediate chunk file and records its path.
fn flush_chunk(
    chunk: &mut Vec<FlatRecord>,
    chunk_dir: &Path,
    chunk_files: &mut Vec<PathBuf>,
) -> AppResult<()> {
    let mut df = records_to_dataframe(chunk)?;
    let path = chunk_dir.join(format!("{TEMP_CHUNK_PREFIX}{}.parquet", chunk_files.len()));

    let mut file = File::create(&path)
        .map_err(|e| AppError::WriteError(format!("Failed to create chunk file {path:?}: {e}")))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .map_err(|e| AppError::WriteError(format!("Failed to write chunk file {path:?}: {e}")))?;

    chunk_files.push(path);
    chunk.clear();

    info!(
        chunk = chunk_files.len(),
        rows = df.height(),
        "Saved chunk"
    );
    Ok(())
}

/// Reads every chunk file back and concatenates them into one table.
///
/// Chunks keep their creation order and rows keep their in-chunk order; the
/// column set becomes the union across all chunks, absent columns null-filled.
fn read_back_chunks(chunk_files: &[PathBuf]) -> AppResult<DataFrame> {
    let mut parts = Vec::with_capacity(chunk_files.len());
    for path in chunk_files {
        let file = File::open(path)
            .map_err(|e| AppError::ReadError(format!("Failed to open chunk file {path:?}: {e}")))?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| AppError::ReadError(format!("Failed to read chunk file {path:?}: {e}")))?;
        parts.push(df);
    }

    concat_df_diagonal(&parts)
        .map_err(|e| AppError::WriteError(format!("Failed to concatenate chunk files: {e}")))
}

/// Consumes a record stream and persists it as one deduplicated Parquet table.
///
/// Every `batch_size` non-empty records become an intermediate
/// `temp_chunk_<index>.parquet` in `config.chunk_dir`; a final partial batch is
/// flushed the same way. The intermediates are then merged (schema union,
/// original order), exact-duplicate rows are dropped keeping first occurrences,
/// and the result lands at `output_path`. Intermediates are deleted afterwards
/// unless `should_cleanup` is false.
///
/// A stream that yields no records is not an error: a warning is logged, no
/// output file is written, and the returned summary is all zeros.
///
/// # Errors
///
/// The first `Err` pulled from the stream aborts the conversion, as does any
/// I/O failure on an intermediate or the final write. Intermediates already
/// written are not cleaned up on these paths.
pub fn write_records<I>(
    records: I,
    output_path: &Path,
    config: &ResolvedConfig,
    should_cleanup: bool,
) -> AppResult<ConversionSummary>
where
    I: IntoIterator<Item = AppResult<FlatRecord>>,
{
    let start = Instant::now();

    fs::create_dir_all(&config.chunk_dir)
        .map_err(|e| AppError::IoError(format!("Failed to create chunk directory: {e}")))?;
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::IoError(format!("Failed to create output directory: {e}")))?;
    }

    let mut chunk_files: Vec<PathBuf> = Vec::new();
    let mut chunk: Vec<FlatRecord> = Vec::new();
    let mut total_records = 0usize;

    for record in records {
        let record = record?;
        if record.is_empty() {
            continue;
        }
        chunk.push(record);
        total_records += 1;

        if chunk.len() == config.batch_size {
            flush_chunk(&mut chunk, &config.chunk_dir, &mut chunk_files)?;
        }
    }

    // Handle remaining data
    if !chunk.is_empty() {
        flush_chunk(&mut chunk, &config.chunk_dir, &mut chunk_files)?;
    }

    if chunk_files.is_empty() {
        warn!("No records parsed, skipping output");
        return Ok(ConversionSummary {
            rows: 0,
            columns: 0,
            chunks: 0,
            output: None,
        });
    }

    debug!(
        chunks = chunk_files.len(),
        records = total_records,
        "Merging chunk files"
    );

    let combined = read_back_chunks(&chunk_files)?;
    let mut merged = combined
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()
        .map_err(|e| AppError::WriteError(format!("Failed to deduplicate table: {e}")))?;

    let mut file = File::create(output_path).map_err(|e| {
        AppError::WriteError(format!(
            "Failed to create Parquet file {output_path:?}: {e}"
        ))
    })?;
    ParquetWriter::new(&mut file)
        .finish(&mut merged)
        .map_err(|e| AppError::WriteError(format!("Failed to write Parquet file: {e}")))?;

    cleanup_chunks(&chunk_files, should_cleanup);

    let elapsed = start.elapsed();
    let output_bytes = fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
    info!(
        records = total_records,
        rows = merged.height(),
        columns = merged.width(),
        chunks = chunk_files.len(),
        elapsed = format_duration(elapsed),
        throughput_mb_s = throughput_mb_s(output_bytes, elapsed),
        "Conversion completed"
    );

    Ok(ConversionSummary {
        rows: merged.height(),
        columns: merged.width(),
        chunks: chunk_files.len(),
        output: Some(output_path.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn record(pairs: &[(&str, &str)]) -> FlatRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>()
    }

    fn test_config(dir: &Path, batch_size: usize) -> ResolvedConfig {
        ResolvedConfig {
            batch_size,
            chunk_dir: dir.to_path_buf(),
            ..ResolvedConfig::default()
        }
    }

    fn chunk_leftovers(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with(TEMP_CHUNK_PREFIX)
            })
            .count()
    }

    #[test]
    fn records_to_dataframe_unions_columns() {
        let records = vec![
            record(&[("situation_id", "S1"), ("speed", "80")]),
            record(&[("situation_id", "S2"), ("delay", "120")]),
        ];

        let df = records_to_dataframe(&records).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        // Missing keys become nulls
        let delay = df.column("delay").unwrap();
        assert_eq!(delay.null_count(), 1);
    }

    #[test]
    fn write_records_single_batch() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.parquet");
        let config = test_config(temp_dir.path(), 100);

        let records = vec![
            Ok(record(&[("situation_id", "S1"), ("speed", "80")])),
            Ok(record(&[("situation_id", "S1"), ("delay", "120")])),
        ];

        let summary = write_records(records, &output, &config, true).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.output.as_deref(), Some(output.as_path()));

        let df = ParquetReader::new(File::open(&output).unwrap())
            .finish()
            .unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.column("situation_id").is_ok());
        assert!(df.column("speed").is_ok());
    }

    #[test]
    fn chunking_does_not_change_the_merged_table() {
        let records: Vec<FlatRecord> = (0..5)
            .map(|i| record(&[("situation_id", format!("S{i}").as_str()), ("n", "1")]))
            .collect();

        let temp_one = TempDir::new().unwrap();
        let out_one = temp_one.path().join("one.parquet");
        let one = write_records(
            records.iter().cloned().map(Ok),
            &out_one,
            &test_config(temp_one.path(), 100),
            true,
        )
        .unwrap();

        let temp_two = TempDir::new().unwrap();
        let out_two = temp_two.path().join("two.parquet");
        let two = write_records(
            records.iter().cloned().map(Ok),
            &out_two,
            &test_config(temp_two.path(), 2),
            true,
        )
        .unwrap();

        assert_eq!(one.rows, 5);
        assert_eq!(two.rows, 5);
        assert_eq!(one.columns, two.columns);
        assert_eq!(two.chunks, 3);
    }

    #[test]
    fn exact_duplicate_rows_are_dropped_across_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.parquet");
        // batch_size 1: the duplicate lands in a different chunk file
        let config = test_config(temp_dir.path(), 1);

        let row = record(&[("situation_id", "S1"), ("speed", "80")]);
        let records = vec![
            Ok(row.clone()),
            Ok(record(&[("situation_id", "S1"), ("delay", "120")])),
            Ok(row),
        ];

        let summary = write_records(records, &output, &config, true).unwrap();
        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.rows, 2);
    }

    #[test]
    fn intermediate_chunk_files_are_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.parquet");
        let config = test_config(temp_dir.path(), 1);

        let records = vec![
            Ok(record(&[("situation_id", "S1")])),
            Ok(record(&[("situation_id", "S2")])),
        ];

        write_records(records, &output, &config, true).unwrap();
        assert_eq!(chunk_leftovers(temp_dir.path()), 0);
        assert!(output.exists());
    }

    #[test]
    fn keep_chunks_leaves_intermediates_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.parquet");
        let config = test_config(temp_dir.path(), 1);

        let records = vec![
            Ok(record(&[("situation_id", "S1")])),
            Ok(record(&[("situation_id", "S2")])),
        ];

        write_records(records, &output, &config, false).unwrap();
        assert_eq!(chunk_leftovers(temp_dir.path()), 2);
    }

    #[test]
    fn empty_stream_writes_no_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.parquet");
        let config = test_config(temp_dir.path(), 10);

        let summary = write_records(std::iter::empty(), &output, &config, true).unwrap();
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.chunks, 0);
        assert!(summary.output.is_none());
        assert!(!output.exists());
    }

    #[test]
    fn parse_error_aborts_conversion() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.parquet");
        let config = test_config(temp_dir.path(), 10);

        let records = vec![
            Ok(record(&[("situation_id", "S1")])),
            Err(AppError::ParseError("broken tag".to_string())),
        ];

        let result = write_records(records, &output, &config, true);
        assert!(matches!(result, Err(AppError::ParseError(_))));
        assert!(!output.exists());
    }

    #[test]
    fn empty_records_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.parquet");
        let config = test_config(temp_dir.path(), 10);

        let records = vec![
            Ok(FlatRecord::new()),
            Ok(record(&[("situation_id", "S1")])),
        ];

        let summary = write_records(records, &output, &config, true).unwrap();
        assert_eq!(summary.rows, 1);
    }
}
