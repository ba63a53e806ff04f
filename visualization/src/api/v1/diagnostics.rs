use crate::database::FeedDatabase;
use actix_web::{get, web, Responder, Result};

#[get("/api/v1/diagnostics")]
pub(crate) async fn diagnostics(db: web::Data<FeedDatabase>) -> Result<impl Responder> {
    let db = db.into_inner();
    let diagnostics = web::block(move || crate::route_view::diagnostics(&db)).await??;

    Ok(web::Json(diagnostics))
}
