pub mod config;
pub mod diagnostics;
pub mod route;
pub mod routes;

pub use config::config as config_api;
pub use diagnostics::diagnostics as diagnostics_api;
pub use route::route as route_api;
pub use routes::routes as routes_api;
