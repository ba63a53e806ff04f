use crate::database::FeedDatabase;
use crate::route_view::route_options;
use actix_web::{get, web, Responder, Result};

#[get("/api/v1/routes")]
pub(crate) async fn routes(db: web::Data<FeedDatabase>) -> Result<impl Responder> {
    let db = db.into_inner();
    let options = web::block(move || route_options(&db)).await??;

    Ok(web::Json(options))
}
