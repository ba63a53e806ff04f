pub mod df;
pub mod logging;
pub mod store;
