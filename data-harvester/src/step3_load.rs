use crate::gtfs_file::{table_name, GTFS_FILES_TO_IMPORT};
use chrono::Utc;
use common::util::df::write_df_to_file;
use common::util::logging::run_with_spinner;
use common::util::store::{table_path, META_TABLE};
use log::{info, warn};
use polars::frame::DataFrame;
use polars::prelude::{DataType, LazyCsvReader, LazyFileListReader, NamedFrom, Series, TimeUnit};
use std::fmt::Display;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::{fmt, io};

/// Reads one feed file into one table of the store. Every column is read as text so that
/// identifiers such as `007` keep their exact spelling.
#[derive(Debug, Clone)]
pub struct TableLoad {
    pub table: &'static str,
    pub source: PathBuf,
}

impl TableLoad {
    /// Replaces the table with the contents of `source`. Returns the number of rows.
    pub fn run(&self, store: &Path) -> Result<usize, LoadError> {
        let frame = LazyCsvReader::new(&self.source)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;
        let rows = frame.height();

        write_df_to_file(&table_path(store, self.table), frame)?;

        Ok(rows)
    }
}

/// One load step for each feed file present in `extracted_dir`
pub fn plan_loads(extracted_dir: &Path) -> (Vec<TableLoad>, Vec<&'static str>) {
    let mut loads = vec![];
    let mut missing = vec![];

    for file in GTFS_FILES_TO_IMPORT {
        let source = extracted_dir.join(file);
        if source.is_file() {
            loads.push(TableLoad {
                table: table_name(file),
                source,
            });
        } else {
            missing.push(file);
        }
    }

    (loads, missing)
}

/// Loads every feed file of `extracted_dir` into `store` and records the load in the meta
/// table. Tables are replaced one at a time: if a load fails, the tables before it are
/// already replaced and the ones after it keep their previous contents.
pub fn load_feed(extracted_dir: &Path, store: &Path) -> Result<LoadStepOutput, LoadError> {
    create_dir_all(store)?;

    let (loads, missing) = plan_loads(extracted_dir);
    for file in &missing {
        warn!(target: "load", "{file} is not part of this feed, skipping it");
    }

    let mut loaded = vec![];
    for load in loads {
        let task_desc = format!("Loading {} into table {}", load.source.display(), load.table);
        let rows = run_with_spinner("load", &task_desc, || load.run(store))?;
        loaded.push(LoadedTable {
            name: load.table.to_string(),
            rows,
        });
    }

    write_meta(store, extracted_dir)?;
    info!(target: "load", "Store at {} is ready ({} tables)", store.display(), loaded.len());

    Ok(LoadStepOutput {
        loaded,
        skipped: missing.into_iter().map(|file| table_name(file).to_string()).collect(),
    })
}

fn write_meta(store: &Path, extracted_dir: &Path) -> Result<(), LoadError> {
    let loaded_at = Series::new("loaded_at".into(), [Utc::now().timestamp_millis()])
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    let extracted_dir = Series::new(
        "extracted_dir".into(),
        [extracted_dir.display().to_string()],
    );

    let meta = DataFrame::new(vec![loaded_at.into(), extracted_dir.into()])?;
    write_df_to_file(&table_path(store, META_TABLE), meta)?;

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub name: String,
    pub rows: usize,
}

pub struct LoadStepOutput {
    pub loaded: Vec<LoadedTable>,
    pub skipped: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    Polars(#[from] polars::error::PolarsError),
    File(#[from] io::Error),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let err: &dyn Display = match self {
            LoadError::Polars(err) => err,
            LoadError::File(err) => err,
        };
        write!(f, "{}", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::util::df::strings;
    use common::util::store::list_tables;
    use polars::prelude::{LazyFrame, ScanArgsParquet};
    use std::fs;

    fn write_feed(dir: &Path) {
        fs::write(
            dir.join("stops.txt"),
            "stop_id,stop_name,stop_lat,stop_lon\n007,Plaza Italia,-33.40,-70.60\nS2,Maipú,-33.42,-70.62\n",
        )
        .unwrap();
        fs::write(
            dir.join("routes.txt"),
            "route_id,route_short_name,route_long_name\nR1,506,Plaza Italia - Maipú\n",
        )
        .unwrap();
        fs::write(
            dir.join("trips.txt"),
            "route_id,service_id,trip_id,direction_id\nR1,L,T1,0\n",
        )
        .unwrap();
        fs::write(
            dir.join("stop_times.txt"),
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\nT1,06:00:00,06:00:00,007,1\nT1,06:10:00,06:10:00,S2,2\n",
        )
        .unwrap();
    }

    fn read_table(store: &Path, table: &str) -> DataFrame {
        LazyFrame::scan_parquet(table_path(store, table), ScanArgsParquet::default())
            .unwrap()
            .collect()
            .unwrap()
    }

    #[test]
    fn test_plan_skips_missing_files() {
        let feed = tempfile::tempdir().unwrap();
        write_feed(feed.path());

        let (loads, missing) = plan_loads(feed.path());

        let tables: Vec<&str> = loads.iter().map(|l| l.table).collect();
        assert_eq!(tables, vec!["stops", "routes", "trips", "stop_times"]);
        assert_eq!(missing.len(), 8);
        assert!(missing.contains(&"shapes.txt"));
    }

    #[test]
    fn test_load_feed_without_shapes() {
        let feed = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        write_feed(feed.path());

        let output = load_feed(feed.path(), store.path()).unwrap();

        assert_eq!(
            output.loaded,
            vec![
                LoadedTable { name: "stops".into(), rows: 2 },
                LoadedTable { name: "routes".into(), rows: 1 },
                LoadedTable { name: "trips".into(), rows: 1 },
                LoadedTable { name: "stop_times".into(), rows: 2 },
            ]
        );
        assert!(output.skipped.contains(&"shapes".to_string()));
        assert_eq!(
            list_tables(store.path()).unwrap(),
            vec!["_meta", "routes", "stop_times", "stops", "trips"]
        );
    }

    #[test]
    fn test_all_columns_are_text() {
        let feed = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        write_feed(feed.path());

        load_feed(feed.path(), store.path()).unwrap();

        let stops = read_table(store.path(), "stops");
        assert!(stops.dtypes().iter().all(|dtype| *dtype == DataType::String));
        assert_eq!(
            strings(&stops, "stop_id").unwrap(),
            vec![Some("007".to_string()), Some("S2".to_string())]
        );
        assert_eq!(
            strings(&stops, "stop_lat").unwrap(),
            vec![Some("-33.40".to_string()), Some("-33.42".to_string())]
        );
    }

    #[test]
    fn test_malformed_file_aborts_load() {
        let old_feed = tempfile::tempdir().unwrap();
        let new_feed = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        write_feed(old_feed.path());
        load_feed(old_feed.path(), store.path()).unwrap();

        write_feed(new_feed.path());
        fs::write(
            new_feed.path().join("stops.txt"),
            "stop_id,stop_name,stop_lat,stop_lon\nNEW,Nueva,-33.50,-70.70\n",
        )
        .unwrap();
        fs::write(
            new_feed.path().join("routes.txt"),
            "route_id,route_short_name\nR1,506,Plaza Italia,extra\n",
        )
        .unwrap();
        fs::write(
            new_feed.path().join("trips.txt"),
            "route_id,service_id,trip_id,direction_id\nR1,L,NEW_TRIP,1\n",
        )
        .unwrap();

        assert!(load_feed(new_feed.path(), store.path()).is_err());

        // Tables before the broken file are replaced, the rest keep the previous load
        let stops = read_table(store.path(), "stops");
        assert_eq!(strings(&stops, "stop_id").unwrap(), vec![Some("NEW".to_string())]);
        let routes = read_table(store.path(), "routes");
        assert_eq!(strings(&routes, "route_id").unwrap(), vec![Some("R1".to_string())]);
        assert_eq!(routes.width(), 3);
        let trips = read_table(store.path(), "trips");
        assert_eq!(strings(&trips, "trip_id").unwrap(), vec![Some("T1".to_string())]);
        let meta = read_table(store.path(), META_TABLE);
        assert_eq!(
            strings(&meta, "extracted_dir").unwrap(),
            vec![Some(old_feed.path().display().to_string())]
        );
    }

    #[test]
    fn test_reload_replaces_tables_and_meta() {
        let feed = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        write_feed(feed.path());
        load_feed(feed.path(), store.path()).unwrap();

        fs::write(
            feed.path().join("routes.txt"),
            "route_id,route_short_name,route_long_name\nR9,D09,Vitacura - Cantagallo\nR10,,Nocturno\n",
        )
        .unwrap();
        load_feed(feed.path(), store.path()).unwrap();

        let routes = read_table(store.path(), "routes");
        assert_eq!(routes.height(), 2);

        let meta = read_table(store.path(), META_TABLE);
        assert_eq!(meta.height(), 1);
        assert_eq!(
            strings(&meta, "extracted_dir").unwrap(),
            vec![Some(feed.path().display().to_string())]
        );
        assert!(matches!(
            meta.column("loaded_at").unwrap().dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, _)
        ));
    }
}
