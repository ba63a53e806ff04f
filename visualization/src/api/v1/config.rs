use actix_web::{get, web, Responder, Result};
use common::types::config::DashboardConfig;

#[get("/api/v1/config")]
pub(crate) async fn config(config: web::Data<DashboardConfig>) -> Result<impl Responder> {
    Ok(web::Json(config))
}
