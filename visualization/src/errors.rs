use actix_web::http::StatusCode;
use actix_web::ResponseError;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    MissingDatabase(PathBuf),
    MissingTable(String),
    Polars(#[from] polars::error::PolarsError),
    Io(#[from] std::io::Error),
}

impl Display for DashboardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DashboardError::MissingDatabase(path) => write!(
                f,
                "No database at {}. Run `transitlens fetch` and then `transitlens load` first.",
                path.display()
            ),
            DashboardError::MissingTable(table) => write!(
                f,
                "Table '{table}' was not loaded. Does the feed contain {table}.txt?"
            ),
            DashboardError::Polars(e) => write!(f, "Query failed: {e}"),
            DashboardError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl ResponseError for DashboardError {
    fn status_code(&self) -> StatusCode {
        match self {
            DashboardError::MissingTable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
