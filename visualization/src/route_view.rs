use crate::database::{FeedDatabase, RouteRow, StopVisit, TextTable, TripRow};
use crate::errors::DashboardError;
use common::types::config::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteOption {
    pub route_id: String,
    pub label: String,
}

impl From<RouteRow> for RouteOption {
    fn from(route: RouteRow) -> Self {
        let short_name = route.short_name.unwrap_or_default();
        let long_name = route.long_name.unwrap_or_default();

        let label = if short_name.is_empty() {
            format!("{} ({})", long_name, route.route_id)
        } else {
            format!("{} — {}", short_name, long_name)
        };

        Self {
            route_id: route.route_id,
            label,
        }
    }
}

/// All routes for the route selector. Routes without a short name are listed last.
pub fn route_options(db: &FeedDatabase) -> Result<Vec<RouteOption>, DashboardError> {
    let mut routes = db.routes()?;

    routes.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    Ok(routes.into_iter().map(RouteOption::from).collect())
}

fn sort_key(route: &RouteRow) -> (bool, &str, &str, &str) {
    let short_name = route.short_name.as_deref().unwrap_or_default();
    (
        short_name.is_empty(),
        short_name,
        route.long_name.as_deref().unwrap_or_default(),
        route.route_id.as_str(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "both")]
    Both,
    #[serde(rename = "0")]
    Outbound,
    #[serde(rename = "1")]
    Inbound,
}

impl Direction {
    pub fn matches(&self, direction_id: Option<&str>) -> bool {
        match self {
            Direction::Both => true,
            Direction::Outbound => direction_id.map(str::trim) == Some("0"),
            Direction::Inbound => direction_id.map(str::trim) == Some("1"),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Both => write!(f, "both directions"),
            Direction::Outbound => write!(f, "direction 0"),
            Direction::Inbound => write!(f, "direction 1"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteQuery {
    pub route_id: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "enabled")]
    pub show_shapes: bool,
    #[serde(default = "enabled")]
    pub show_stops: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// The filter matched no trips. Shown as a notice instead of a map.
    NoTrips { message: String },
    Ready(RouteView),
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    pub metrics: RouteMetrics,
    pub trip: TripDetails,
    pub stops: Vec<StopVisit>,
    pub map: MapView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMetrics {
    /// Trips of the route in the selected direction
    pub n_trips: usize,
    /// Distinct stops served by the route in any direction
    pub n_stops: u32,
    /// Earliest arrival of the representative trip
    pub first_time: Option<String>,
    /// Latest departure of the representative trip
    pub last_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripDetails {
    pub route_id: String,
    pub trip_id: String,
    pub direction_id: Option<String>,
    pub shape_id: Option<String>,
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterSource {
    Stops,
    Shape,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: GeoPoint,
    pub center_source: CenterSource,
    /// The shape of the trip, empty when not drawn
    pub path: Vec<GeoPoint>,
    pub markers: Vec<MapMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub position: GeoPoint,
    pub popup: String,
}

impl From<&StopVisit> for MapMarker {
    fn from(visit: &StopVisit) -> Self {
        let name = visit.stop_name.as_deref().unwrap_or_default();
        let popup = match visit.stop_sequence {
            Some(sequence) => format!("{}. {} ({})", sequence, name, visit.stop_id),
            None => format!("{} ({})", name, visit.stop_id),
        };

        Self {
            position: visit.position,
            popup,
        }
    }
}

/// Builds everything shown for one route. One trip stands in for the whole route on the
/// map: the one with the lowest `trip_id`.
pub fn build_route_view(
    db: &FeedDatabase,
    query: &RouteQuery,
    default_center: GeoPoint,
) -> Result<RouteOutcome, DashboardError> {
    let mut trips: Vec<TripRow> = db
        .trips_for_route(&query.route_id)?
        .into_iter()
        .filter(|trip| query.direction.matches(trip.direction_id.as_deref()))
        .collect();

    trips.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));
    let Some(representative) = trips.first() else {
        return Ok(RouteOutcome::NoTrips {
            message: format!(
                "No trips found for route {} in {}",
                query.route_id, query.direction
            ),
        });
    };

    let n_stops = db.count_stops_on_route(&query.route_id)?;
    let (first_time, last_time) = db.trip_time_span(&representative.trip_id)?;
    let stops = db.stop_visits(&representative.trip_id)?;

    let shape = match representative.shape_id.as_deref() {
        Some(shape_id) if query.show_shapes && !shape_id.is_empty() && db.has_table("shapes") => {
            db.shape_points(shape_id)?
        }
        _ => vec![],
    };

    let stop_positions: Vec<GeoPoint> = stops.iter().map(|visit| visit.position).collect();
    let (center, center_source) = map_center(&stop_positions, &shape, default_center);

    let map = MapView {
        center,
        center_source,
        path: shape,
        markers: if query.show_stops {
            stops.iter().map(MapMarker::from).collect()
        } else {
            vec![]
        },
    };

    Ok(RouteOutcome::Ready(RouteView {
        metrics: RouteMetrics {
            n_trips: trips.len(),
            n_stops,
            first_time,
            last_time,
        },
        trip: TripDetails {
            route_id: query.route_id.clone(),
            trip_id: representative.trip_id.clone(),
            direction_id: representative.direction_id.clone(),
            shape_id: representative.shape_id.clone(),
            service_id: representative.service_id.clone(),
        },
        stops,
        map,
    }))
}

/// Centers on the stops if there are any, otherwise on the shape, otherwise on `fallback`
pub fn map_center(
    stops: &[GeoPoint],
    shape: &[GeoPoint],
    fallback: GeoPoint,
) -> (GeoPoint, CenterSource) {
    if let Some(center) = mean(stops) {
        (center, CenterSource::Stops)
    } else if let Some(center) = mean(shape) {
        (center, CenterSource::Shape)
    } else {
        (fallback, CenterSource::Default)
    }
}

fn mean(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let (lat, lon) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    Some(GeoPoint {
        lat: lat / n,
        lon: lon / n,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub tables: Vec<String>,
    pub meta: TextTable,
}

pub fn diagnostics(db: &FeedDatabase) -> Result<Diagnostics, DashboardError> {
    Ok(Diagnostics {
        tables: db.table_names()?,
        meta: db.metadata()?,
    })
}
