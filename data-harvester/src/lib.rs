pub mod gtfs_file;
pub mod step1_fetch;
pub mod step2_extract;
pub mod step3_load;
