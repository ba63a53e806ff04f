use crate::database::FeedDatabase;
use crate::route_view::{build_route_view, RouteQuery};
use actix_web::{get, web, Responder, Result};
use common::types::config::DashboardConfig;
use log::debug;

/// Metrics, trip details and map data for `?route_id=..&direction=both|0|1`
#[get("/api/v1/route")]
pub(crate) async fn route(
    db: web::Data<FeedDatabase>,
    config: web::Data<DashboardConfig>,
    query: web::Query<RouteQuery>,
) -> Result<impl Responder> {
    let query = query.into_inner();
    debug!(target: "dashboard", "Route {} in {}", query.route_id, query.direction);

    let db = db.into_inner();
    let default_center = config.default_center;
    let outcome = web::block(move || build_route_view(&db, &query, default_center)).await??;

    Ok(web::Json(outcome))
}
