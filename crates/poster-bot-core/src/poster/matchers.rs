//! Poster heuristics
//!
//! Small pure functions over search results and parsed storefront pages.
//! Image matchers are tried in the order of [`IMAGE_MATCHERS`]; the first
//! source that qualifies as an absolute http(s) URL wins.

// lazy_regex! statics use once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use crate::config::{STOREFRONT_DETAILS_PATH, STOREFRONT_HOST};
use lazy_regex::lazy_regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Aspect-ratio token of a Play Store feature graphic
pub const FEATURE_GRAPHIC_SIZE: &str = "1024x500";

/// Words that mark an image as promotional artwork
static RE_FEATURE_MARKER: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?i)feature|promo");

/// Extracts raw image sources from a page, in document order
pub type ImageMatcher = fn(&Html) -> Vec<String>;

/// Image matchers, highest priority first
pub const IMAGE_MATCHERS: &[(&str, ImageMatcher)] = &[
    ("feature_graphic", feature_graphic_sources),
    ("og_image", og_image_sources),
];

/// Is `candidate` a storefront page worth fetching?
///
/// Always requires the storefront host. In strict mode the URL must also be
/// an app-detail page carrying an `id` parameter.
#[must_use]
pub fn is_storefront_candidate(candidate: &str, strict: bool) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str() != Some(STOREFRONT_HOST) {
        return false;
    }
    if !strict {
        return true;
    }
    url.path() == STOREFRONT_DETAILS_PATH
        && url
            .query_pairs()
            .any(|(key, value)| key == "id" && !value.is_empty())
}

/// Does an image source look like a feature graphic?
#[must_use]
pub fn has_feature_marker(src: &str) -> bool {
    src.contains(FEATURE_GRAPHIC_SIZE) || RE_FEATURE_MARKER.is_match(src)
}

fn select_attr(document: &Html, css: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// `<img src>` values carrying a feature-graphic marker
#[must_use]
pub fn feature_graphic_sources(document: &Html) -> Vec<String> {
    select_attr(document, "img[src]", "src")
        .into_iter()
        .filter(|src| has_feature_marker(src))
        .collect()
}

/// Social-preview image declared in `og:image` meta tags
#[must_use]
pub fn og_image_sources(document: &Html) -> Vec<String> {
    select_attr(
        document,
        r#"meta[property="og:image"], meta[name="og:image"]"#,
        "content",
    )
}

/// Turn an image source into an absolute http(s) URL.
///
/// Sources without a scheme are joined onto `origin`. Anything that is not
/// http(s) afterwards (`data:`, `javascript:`, garbage) yields `None`.
#[must_use]
pub fn qualify_source(src: &str, origin: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    let url = match Url::parse(src) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(origin).ok()?.join(src).ok()?,
        Err(_) => return None,
    };

    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Run the matcher chain over a parsed page
#[must_use]
pub fn find_poster(document: &Html, origin: &str) -> Option<String> {
    IMAGE_MATCHERS.iter().find_map(|(name, matcher)| {
        let poster = matcher(document)
            .iter()
            .find_map(|src| qualify_source(src, origin))?;
        debug!(matcher = *name, poster = %poster, "Poster matched");
        Some(poster)
    })
}

/// Parse `html` and run the matcher chain over it
#[must_use]
pub fn find_poster_in_html(html: &str, origin: &str) -> Option<String> {
    find_poster(&Html::parse_document(html), origin)
}
