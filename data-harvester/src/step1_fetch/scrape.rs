use crate::step1_fetch::download::archive_filename;
use itertools::Itertools;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// An eight digit run, such as the `20250301` in `GTFS_20250301.zip`
static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([0-9]{8})(?:[^0-9]|$)").expect("valid regex"));

/// Used when the page has no usable anchors, e.g. because links are built by scripts
static RAW_ZIP_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s"'<>]+\.zip"#).expect("valid regex"));

/// Collects links to `.zip` files from a HTML page. Relative links are resolved against
/// `page_url`. Duplicates are removed, first occurrence wins.
pub fn find_zip_links(page: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(page);
    let anchors = Selector::parse("a[href]").expect("valid selector");

    let mut candidates: Vec<Url> = document
        .select(&anchors)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| page_url.join(href).ok())
        .filter(is_zip_link)
        .collect();

    if candidates.is_empty() {
        candidates = RAW_ZIP_LINK
            .find_iter(page)
            .filter_map(|m| Url::parse(m.as_str()).ok())
            .collect();
    }

    candidates.into_iter().unique().collect()
}

fn is_zip_link(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".zip")
}

pub fn date_token(filename: &str) -> Option<&str> {
    DATE_TOKEN
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Picks the archive with the latest date token in its filename. Ties are broken by
/// filename, then by full url. Undated archives lose against dated ones.
pub fn choose_latest(candidates: Vec<Url>) -> Option<Url> {
    candidates.into_iter().max_by_key(selection_key)
}

fn selection_key(url: &Url) -> (Option<String>, String, String) {
    let filename = archive_filename(url);
    let date = date_token(&filename).map(str::to_string);
    (date, filename, url.to_string())
}
