use polars::datatypes::AnyValue;
use polars::error::{PolarsError, PolarsResult};
use polars::frame::DataFrame;
use polars::prelude::{LazyFrame, ParquetWriter};
use std::fs::create_dir_all;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn count(frame: LazyFrame) -> PolarsResult<u32> {
    let count = frame.count().collect()?;
    match count[0].get(0)? {
        AnyValue::UInt32(count) => Ok(count),
        _ => Err(PolarsError::ComputeError("Count was not u32".into())),
    }
}

/// Reads a string column. Nulls stay `None`.
pub fn strings(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let values = frame
        .column(name)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

/// Like [`strings`], but a missing column reads as all nulls
pub fn optional_strings(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    match frame.column(name) {
        Ok(_) => strings(frame, name),
        Err(PolarsError::ColumnNotFound(_)) => Ok(vec![None; frame.height()]),
        Err(e) => Err(e),
    }
}

/// Renders a cell for display. Strings are returned without quotes.
pub fn display_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

/// Writes `df` as parquet to `path`. The file is written next to its destination first and
/// then renamed, so readers see either the old or the new table.
pub fn write_df_to_file(path: &Path, mut df: DataFrame) -> Result<(), PolarsError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    create_dir_all(parent)?;

    let mut tmp_file = NamedTempFile::new_in(parent)?;
    ParquetWriter::new(tmp_file.as_file_mut()).finish(&mut df)?;
    tmp_file.persist(path).map_err(|e| PolarsError::from(e.error))?;

    Ok(())
}
