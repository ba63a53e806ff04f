//! Layout of the table store: a directory with one parquet file per table.

use std::fs::read_dir;
use std::io;
use std::path::{Path, PathBuf};

pub const TABLE_FILE_EXTENSION: &str = "parquet";

/// Single-row table with the load timestamp and the directory the tables were read from
pub const META_TABLE: &str = "_meta";

pub fn table_path(store: &Path, table: &str) -> PathBuf {
    store.join(format!("{table}.{TABLE_FILE_EXTENSION}"))
}

pub fn has_table(store: &Path, table: &str) -> bool {
    table_path(store, table).is_file()
}

/// Names of all tables in the store, sorted
pub fn list_tables(store: &Path) -> io::Result<Vec<String>> {
    let mut tables = vec![];

    for entry in read_dir(store)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != TABLE_FILE_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            tables.push(stem.to_string());
        }
    }

    tables.sort();
    Ok(tables)
}
