//! Fixtures: a small feed modelled on Santiago's network, written straight into a store.

use crate::database::FeedDatabase;
use common::util::df::write_df_to_file;
use common::util::store::{table_path, META_TABLE};
use polars::df;
use polars::frame::DataFrame;
use polars::prelude::{DataType, NamedFrom, Series, TimeUnit};
use std::path::Path;
use tempfile::TempDir;

fn write_table(store: &Path, table: &str, frame: DataFrame) {
    write_df_to_file(&table_path(store, table), frame).unwrap();
}

/// Routes:
/// - R1 `506`: one trip T1 over S1 and S2
/// - R2 `D09`: T2 (direction 0) over S1, S2 after midnight and T3 (direction 1) over S2, S3
///   and a visit of S1 with a broken sequence number
/// - R3 without short name: T4 without direction, visiting only an unknown stop
/// - R4 with empty short name: T5 without any stop times
///
/// There is no shapes table, see [`add_shapes`].
pub(crate) fn santiago_store() -> (TempDir, FeedDatabase) {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path();

    let routes = df![
        "route_id" => ["R1", "R2", "R3", "R4"],
        "route_short_name" => [Some("506"), Some("D09"), None, Some("")],
        "route_long_name" => [
            "Plaza Italia - Maipú",
            "Vitacura - Cantagallo",
            "Nocturno",
            "Sin datos",
        ],
    ]
    .unwrap();
    write_table(store, "routes", routes);

    let trips = df![
        "route_id" => ["R1", "R2", "R2", "R3", "R4"],
        "service_id" => ["L", "L", "L", "S", "D"],
        "trip_id" => ["T1", "T3", "T2", "T4", "T5"],
        "direction_id" => [Some("0"), Some("1"), Some("0"), None, Some("0")],
        "shape_id" => [Some("SH1"), None, None, Some("SH2"), None],
    ]
    .unwrap();
    write_table(store, "trips", trips);

    let stops = df![
        "stop_id" => ["S1", "S2", "S3", "S4"],
        "stop_name" => ["Plaza Italia", "Maipú", "Vitacura", "Sin coordenadas"],
        "stop_lat" => [Some("-33.40"), Some("-33.42"), Some("-33.39"), None],
        "stop_lon" => [Some("-70.60"), Some("-70.62"), Some("-70.59"), None],
    ]
    .unwrap();
    write_table(store, "stops", stops);

    let stop_times = df![
        "trip_id" => ["T1", "T1", "T2", "T2", "T3", "T3", "T3", "T4"],
        "arrival_time" => [
            "06:00:00", "06:10:00", "23:50:00", "24:00:00", "07:10:00", "07:00:00", "07:20:00",
            "08:00:00",
        ],
        "departure_time" => [
            "06:00:00", "06:10:00", "23:55:00", "24:05:00", "07:10:00", "07:00:00", "07:20:00",
            "08:00:00",
        ],
        "stop_id" => ["S1", "S2", "S1", "S2", "S3", "S2", "S1", "S99"],
        "stop_sequence" => ["1", "2", "1", "2", "10", "9", "x", "1"],
    ]
    .unwrap();
    write_table(store, "stop_times", stop_times);

    let loaded_at = Series::new("loaded_at".into(), [1_740_830_400_000i64])
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .unwrap();
    let extracted_dir = Series::new("extracted_dir".into(), ["data/extracted/GTFS_20250301"]);
    let meta = DataFrame::new(vec![loaded_at.into(), extracted_dir.into()]).unwrap();
    write_table(store, META_TABLE, meta);

    let db = FeedDatabase::open_read_only(store).unwrap();
    (dir, db)
}

/// Adds a shapes table. SH2 has three usable points, listed out of order, and one point with
/// broken coordinates.
pub(crate) fn add_shapes(store: &Path) {
    let shapes = df![
        "shape_id" => ["SH2", "SH2", "SH2", "SH2", "SH1", "SH1"],
        "shape_pt_lat" => ["-33.45", "-33.43", "-33.44", "x", "-33.40", "-33.42"],
        "shape_pt_lon" => ["-70.65", "-70.63", "-70.64", "-70.66", "-70.60", "-70.62"],
        "shape_pt_sequence" => ["3", "1", "2", "4", "1", "2"],
    ]
    .unwrap();
    write_table(store, "shapes", shapes);
}
