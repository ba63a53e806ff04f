/// Feed files that are loaded into the store. Every one of them is optional.
pub const GTFS_FILES_TO_IMPORT: [&str; 12] = [
    "agency.txt",
    "stops.txt",
    "routes.txt",
    "trips.txt",
    "stop_times.txt",
    "calendar.txt",
    "calendar_dates.txt",
    "shapes.txt",
    "frequencies.txt",
    "transfers.txt",
    "pathways.txt",
    "feed_info.txt",
];

/// `stop_times.txt` is stored in table `stop_times`
pub fn table_name(file_name: &str) -> &str {
    file_name.strip_suffix(".txt").unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        let tables: Vec<&str> = GTFS_FILES_TO_IMPORT.iter().map(|f| table_name(f)).collect();
        assert_eq!(tables[4], "stop_times");
        assert_eq!(tables[11], "feed_info");
        assert!(tables.iter().all(|t| !t.contains('.')));
    }
}
