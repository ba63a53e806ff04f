//! Read-only access to the table store written by the loader.

use crate::errors::DashboardError;
use common::types::config::GeoPoint;
use common::util::df::{count, display_value, optional_strings, strings};
use common::util::store::{has_table, list_tables, table_path, META_TABLE};
use itertools::izip;
use polars::frame::UniqueKeepStrategy;
use polars::prelude::{col, lit, LazyFrame, ScanArgsParquet};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Handle on the store. It only ever reads, so any number of dashboards can share a store.
#[derive(Debug, Clone)]
pub struct FeedDatabase {
    store: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRow {
    pub route_id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripRow {
    pub trip_id: String,
    pub direction_id: Option<String>,
    pub shape_id: Option<String>,
    pub service_id: Option<String>,
}

/// A stop on a trip, in the order the trip serves it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopVisit {
    /// `None` when the feed's value is not a number
    pub stop_sequence: Option<i64>,
    pub stop_id: String,
    pub stop_name: Option<String>,
    pub position: GeoPoint,
}

/// A table rendered as text, for display
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TextTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FeedDatabase {
    /// Opens the store at `store`. Fails if the loader has not created it yet.
    pub fn open_read_only(store: &Path) -> Result<Self, DashboardError> {
        if !store.is_dir() {
            return Err(DashboardError::MissingDatabase(store.to_path_buf()));
        }

        Ok(Self {
            store: store.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.store
    }

    pub fn has_table(&self, table: &str) -> bool {
        has_table(&self.store, table)
    }

    pub fn table_names(&self) -> Result<Vec<String>, DashboardError> {
        Ok(list_tables(&self.store)?)
    }

    fn scan(&self, table: &str) -> Result<LazyFrame, DashboardError> {
        if !self.has_table(table) {
            return Err(DashboardError::MissingTable(table.to_string()));
        }

        let frame =
            LazyFrame::scan_parquet(table_path(&self.store, table), ScanArgsParquet::default())?;
        Ok(frame)
    }

    pub fn routes(&self) -> Result<Vec<RouteRow>, DashboardError> {
        let routes = self.scan("routes")?.collect()?;

        let rows = izip!(
            strings(&routes, "route_id")?,
            optional_strings(&routes, "route_short_name")?,
            optional_strings(&routes, "route_long_name")?,
        )
        .filter_map(|(route_id, short_name, long_name)| {
            Some(RouteRow {
                route_id: route_id?,
                short_name,
                long_name,
            })
        })
        .collect();

        Ok(rows)
    }

    fn trips_of_route(&self, route_id: &str) -> Result<LazyFrame, DashboardError> {
        Ok(self
            .scan("trips")?
            .filter(col("route_id").eq(lit(route_id))))
    }

    pub fn trips_for_route(&self, route_id: &str) -> Result<Vec<TripRow>, DashboardError> {
        let trips = self.trips_of_route(route_id)?.collect()?;

        let rows = izip!(
            strings(&trips, "trip_id")?,
            optional_strings(&trips, "direction_id")?,
            optional_strings(&trips, "shape_id")?,
            optional_strings(&trips, "service_id")?,
        )
        .filter_map(|(trip_id, direction_id, shape_id, service_id)| {
            Some(TripRow {
                trip_id: trip_id?,
                direction_id,
                shape_id,
                service_id,
            })
        })
        .collect();

        Ok(rows)
    }

    /// Number of distinct stops served by any trip of the route
    pub fn count_stops_on_route(&self, route_id: &str) -> Result<u32, DashboardError> {
        let trip_ids = self.trips_of_route(route_id)?.select([col("trip_id")]);

        let stop_ids = self
            .scan("stop_times")?
            .semi_join(trip_ids, col("trip_id"), col("trip_id"))
            .select([col("stop_id")])
            .filter(col("stop_id").is_not_null())
            .unique(None, UniqueKeepStrategy::Any);

        Ok(count(stop_ids)?)
    }

    fn stop_times_of_trip(&self, trip_id: &str) -> Result<LazyFrame, DashboardError> {
        Ok(self
            .scan("stop_times")?
            .filter(col("trip_id").eq(lit(trip_id))))
    }

    /// Earliest arrival and latest departure of a trip, exactly as written in the feed
    pub fn trip_time_span(
        &self,
        trip_id: &str,
    ) -> Result<(Option<String>, Option<String>), DashboardError> {
        let stop_times = self.stop_times_of_trip(trip_id)?.collect()?;

        let first = optional_strings(&stop_times, "arrival_time")?
            .into_iter()
            .flatten()
            .filter(|time| !time.is_empty())
            .min();
        let last = optional_strings(&stop_times, "departure_time")?
            .into_iter()
            .flatten()
            .filter(|time| !time.is_empty())
            .max();

        Ok((first, last))
    }

    /// Stops of a trip ordered by `stop_sequence`, visits without a numeric sequence last.
    /// Visits of unknown stops and stops without usable coordinates are left out.
    pub fn stop_visits(&self, trip_id: &str) -> Result<Vec<StopVisit>, DashboardError> {
        let stop_times = self.stop_times_of_trip(trip_id)?;
        let stops = self
            .scan("stops")?
            .semi_join(stop_times.clone(), col("stop_id"), col("stop_id"))
            .collect()?;
        let stop_times = stop_times.collect()?;

        let stops: HashMap<String, (Option<String>, GeoPoint)> = izip!(
            strings(&stops, "stop_id")?,
            optional_strings(&stops, "stop_name")?,
            optional_strings(&stops, "stop_lat")?,
            optional_strings(&stops, "stop_lon")?,
        )
        .filter_map(|(stop_id, name, lat, lon)| {
            let position = parse_point(lat.as_deref(), lon.as_deref())?;
            Some((stop_id?, (name, position)))
        })
        .collect();

        let mut visits: Vec<StopVisit> = izip!(
            strings(&stop_times, "stop_id")?,
            strings(&stop_times, "stop_sequence")?,
        )
        .filter_map(|(stop_id, sequence)| {
            let stop_id = stop_id?;
            let stop_sequence = sequence.and_then(|s| s.trim().parse::<i64>().ok());
            let (stop_name, position) = stops.get(&stop_id)?.clone();
            Some(StopVisit {
                stop_sequence,
                stop_id,
                stop_name,
                position,
            })
        })
        .collect();

        visits.sort_by(|a, b| sequence_key(a).cmp(&sequence_key(b)));
        Ok(visits)
    }

    /// Points of a shape ordered by `shape_pt_sequence`. Points without a sequence number go
    /// last, points without usable coordinates are left out.
    pub fn shape_points(&self, shape_id: &str) -> Result<Vec<GeoPoint>, DashboardError> {
        let shape = self
            .scan("shapes")?
            .filter(col("shape_id").eq(lit(shape_id)))
            .collect()?;

        let mut points: Vec<(Option<i64>, GeoPoint)> = izip!(
            optional_strings(&shape, "shape_pt_lat")?,
            optional_strings(&shape, "shape_pt_lon")?,
            optional_strings(&shape, "shape_pt_sequence")?,
        )
        .filter_map(|(lat, lon, sequence)| {
            let point = parse_point(lat.as_deref(), lon.as_deref())?;
            let sequence = sequence.and_then(|s| s.trim().parse::<i64>().ok());
            Some((sequence, point))
        })
        .collect();

        points.sort_by_key(|(sequence, _)| (sequence.is_none(), *sequence));
        Ok(points.into_iter().map(|(_, point)| point).collect())
    }

    /// Contents of the meta table, empty if nothing was loaded yet
    pub fn metadata(&self) -> Result<TextTable, DashboardError> {
        if !self.has_table(META_TABLE) {
            return Ok(TextTable::default());
        }
        let meta = self.scan(META_TABLE)?.collect()?;

        let columns = meta
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = Vec::with_capacity(meta.height());
        for idx in 0..meta.height() {
            let row = meta
                .get_columns()
                .iter()
                .map(|column| column.get(idx).map(|value| display_value(&value)))
                .collect::<Result<Vec<String>, _>>()?;
            rows.push(row);
        }

        Ok(TextTable { columns, rows })
    }
}

fn sequence_key(visit: &StopVisit) -> (bool, Option<i64>, &str) {
    (
        visit.stop_sequence.is_none(),
        visit.stop_sequence,
        visit.stop_id.as_str(),
    )
}

fn parse_point(lat: Option<&str>, lon: Option<&str>) -> Option<GeoPoint> {
    let lat = lat?.trim().parse::<f64>().ok()?;
    let lon = lon?.trim().parse::<f64>().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some(GeoPoint { lat, lon })
}
