use actix_web::{get, HttpResponse, Responder};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// The dashboard page. Everything it shows comes from the `/api/v1` endpoints.
#[get("/")]
pub(crate) async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}
