pub mod config;
pub mod provenance;
