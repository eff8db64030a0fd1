use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use pagelens_core::Classification;
use pagelens_dom::{DomHost, NodeId};

/// Hosts served by known advertising networks. Subdomains match.
pub const AD_NETWORKS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "googleadservices.com",
    "adnxs.com",
    "amazon-adsystem.com",
    "media.net",
    "pubmatic.com",
];

static AD_CLASSES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(ad|ads|advertisement|sponsored|promo|banner|advert|adspace|google_ad|adsense)\b")
        .unwrap()
});

static AD_IDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(ad|ads|advertisement|sponsored|promo|banner)\b").unwrap());

// Deliberately loose: any data attribute value mentioning ads counts.
static AD_DATA_VALUES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(ad|advertisement|sponsored)").unwrap());

/// Heuristic ad detection over class list, id, data attributes and
/// embedded-frame sources. No false-positive suppression.
pub fn is_ad(host: &dyn DomHost, id: NodeId) -> bool {
    if let Some(class) = host.attr(id, "class") {
        if AD_CLASSES.is_match(&class) {
            return true;
        }
    }

    if let Some(elem_id) = host.attr(id, "id") {
        if AD_IDS.is_match(&elem_id) {
            return true;
        }
    }

    for (name, value) in host.attrs(id) {
        if name.starts_with("data-") && AD_DATA_VALUES.is_match(&value) {
            return true;
        }
    }

    if host.tag(id).as_deref() == Some("iframe") {
        return matched_network(&frame_source(host, id)).is_some();
    }

    false
}

pub fn analyze_ad(host: &dyn DomHost, id: NodeId) -> Classification {
    let network = if host.tag(id).as_deref() == Some("iframe") {
        matched_network(&frame_source(host, id)).map(str::to_string)
    } else {
        None
    };
    Classification::Ad { network }
}

/// The frame source, preferring `src` over a lazy-load `data-src`.
pub fn frame_source(host: &dyn DomHost, id: NodeId) -> String {
    host.attr(id, "src")
        .filter(|s| !s.is_empty())
        .or_else(|| host.attr(id, "data-src"))
        .unwrap_or_default()
}

fn matched_network(source: &str) -> Option<&'static str> {
    if source.is_empty() {
        return None;
    }
    // Match on the parsed host when possible so a network name in a URL
    // path does not count; unparseable sources fall back to a substring
    // check, which still catches relative lazy-load values.
    match Url::parse(source) {
        Ok(url) => {
            let host = url.host_str()?;
            AD_NETWORKS
                .iter()
                .find(|net| host == **net || host.ends_with(&format!(".{}", net)))
                .copied()
        }
        Err(_) => AD_NETWORKS.iter().find(|net| source.contains(*net)).copied(),
    }
}
