//! Coordinate extraction from map-search URLs and result pages.
//!
//! These are heuristics. Map pages encode the selected place in several
//! ways depending on how the page was reached:
//!
//! - Viewport in the path: `/maps/place/Foo/@5.47,100.20,15z`
//! - Pin in the data blob: `!3d5.4719!4d100.2013`
//! - Query parameters: `?center=5.47%2C100.20`, `&ll=5.47,100.20`
//! - Embedded JSON: `"latitude": 5.47, "longitude": 100.20`
//! - Array literals in inline scripts: `[null,null,5.47,100.20]`
//!
//! Each candidate is checked against a [`BoundingWindow`] and the first one
//! inside it wins. Numbers that happen to look like coordinates but fall
//! outside the window are skipped.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use spot_coords_models::{BoundingWindow, CoordinatePair};

static AT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)").expect("valid regex"));

static PIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!3d(-?\d+(?:\.\d+)?)!4d(-?\d+(?:\.\d+)?)").expect("valid regex")
});

static QUERY_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[?&;](?:center|ll|sll|q|query)=(-?\d+(?:\.\d+)?)(?:,|%2C)\s*(-?\d+(?:\.\d+)?)",
    )
    .expect("valid regex")
});

static JSON_FIELDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)"(?:latitude|lat)"\s*:\s*"?(-?\d+(?:\.\d+)?)"?\s*,\s*"(?:longitude|lng|lon)"\s*:\s*"?(-?\d+(?:\.\d+)?)"#,
    )
    .expect("valid regex")
});

/// Decimal points are required so integer arrays (ids, sizes) are ignored.
static ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*(?:null\s*,\s*)*(-?\d+\.\d+)\s*,\s*(-?\d+\.\d+)\s*\]").expect("valid regex")
});

/// Patterns that can appear in a URL, most specific first.
fn url_patterns() -> [&'static Regex; 3] {
    [&*AT_RE, &*PIN_RE, &*QUERY_PARAM_RE]
}

/// Every pattern, for scanning raw page text.
fn page_patterns() -> [&'static Regex; 5] {
    [&*AT_RE, &*PIN_RE, &*QUERY_PARAM_RE, &*JSON_FIELDS_RE, &*ARRAY_RE]
}

/// Extracts a coordinate from a map URL (or any URL-like string, such as a
/// `data-value` attribute or page title).
#[must_use]
pub fn coordinates_from_url(url: &str, window: &BoundingWindow) -> Option<CoordinatePair> {
    first_match(url, &url_patterns(), window)
}

/// Extracts a coordinate from a rendered result page.
///
/// Looks at structured spots first (`data-value` attributes, the title,
/// `<meta content>`), then scans the raw markup with every known pattern.
#[must_use]
pub fn coordinates_from_page(html: &str, window: &BoundingWindow) -> Option<CoordinatePair> {
    let document = Html::parse_document(html);

    let attribute_values = |css: &str, attr: &str| -> Vec<String> {
        selector(css).map_or_else(Vec::new, |sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr(attr).map(String::from))
                .collect()
        })
    };

    let data_values = attribute_values(r#"[data-value*="@"]"#, "data-value");
    let titles: Vec<String> = selector("title").map_or_else(Vec::new, |sel| {
        document
            .select(&sel)
            .map(|el| el.text().collect::<String>())
            .collect()
    });
    let metas = attribute_values("meta[content]", "content");

    if let Some(pair) = data_values
        .iter()
        .chain(&titles)
        .chain(&metas)
        .find_map(|value| coordinates_from_url(value, window))
    {
        log::debug!("Found {pair} in page attributes");
        return Some(pair);
    }

    first_match(html, &page_patterns(), window)
}

/// Returns the first concrete place link on a multi-result listing page,
/// resolved against `base`.
#[must_use]
pub fn first_place_link(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let sel = selector(r#"a[href*="/maps/place/"]"#)?;

    document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| base.join(href).ok())
}

fn first_match(
    text: &str,
    patterns: &[&Regex],
    window: &BoundingWindow,
) -> Option<CoordinatePair> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text).find_map(|caps| {
            let lat = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let lng = caps.get(2)?.as_str().parse::<f64>().ok()?;
            let pair = CoordinatePair::new(lat, lng);
            if window.contains(pair) {
                Some(pair)
            } else {
                log::debug!("Skipping candidate {pair} outside bounding window");
                None
            }
        })
    })
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css)
        .map_err(|e| log::warn!("invalid CSS selector '{css}': {e}"))
        .ok()
}
