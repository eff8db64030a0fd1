pub mod ad;
pub mod content;
pub mod form;
pub mod hidden;
pub mod insight;
pub mod link;
pub mod visibility;

use pagelens_core::{Classification, HiddenKind, Settings};
use pagelens_dom::{DomHost, NodeId};

pub use content::tooltip_content;
pub use insight::{Insight, Severity};
pub use visibility::indicator_visible;

/// Tags that are document scaffolding rather than page content. They can
/// trip the hidden heuristics (head subtrees never lay out) without being
/// anything a reader should be warned about.
const STRUCTURAL_TAGS: &[&str] = &[
    "html", "head", "body", "base", "meta", "link", "title", "script", "style", "noscript",
    "template",
];

/// Runs the enabled classifiers against one element, first match wins.
/// Precedence: ad, link, form, hidden. Hidden classifications are only
/// reported for the tracking-pixel, hidden-iframe and hidden-form
/// subtypes; a generic invisible element is not annotation-worthy.
pub fn classify(host: &dyn DomHost, id: NodeId, settings: &Settings) -> Option<Classification> {
    let tag = host.tag(id)?;

    if settings.detect_ads && ad::is_ad(host, id) {
        return Some(ad::analyze_ad(host, id));
    }

    if settings.detect_links && tag == "a" && host.attr(id, "href").is_some() {
        if let Some(link) = link::analyze_link(host, id) {
            return Some(link);
        }
    }

    if settings.detect_forms && tag == "form" {
        return Some(form::analyze_form(host, id));
    }

    if settings.detect_hidden
        && !STRUCTURAL_TAGS.contains(&tag.as_str())
        && hidden::is_hidden(host, id)
    {
        let kind = hidden::hidden_kind(host, id);
        if kind != HiddenKind::Other {
            return Some(Classification::Hidden {
                hidden_kind: kind,
                tag,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelens_dom::StaticDom;

    fn host(html: &str) -> StaticDom {
        StaticDom::parse(html, "https://mysite.com/page").unwrap()
    }

    #[test]
    fn test_precedence_ad_over_link() {
        let dom = host(r#"<html><body><a class="sponsored" href="/x">promo</a></body></html>"#);
        let id = dom.query("a")[0];
        let c = classify(&dom, id, &Settings::default()).unwrap();
        assert!(matches!(c, Classification::Ad { .. }));
    }

    #[test]
    fn test_disabled_detector_is_skipped() {
        let dom = host(r#"<html><body><a class="sponsored" href="/x">promo</a></body></html>"#);
        let id = dom.query("a")[0];
        let settings = Settings {
            detect_ads: false,
            ..Settings::default()
        };
        let c = classify(&dom, id, &settings).unwrap();
        assert!(matches!(c, Classification::Link { .. }));
    }

    #[test]
    fn test_plain_paragraph_classifies_as_nothing() {
        let dom = host("<html><body><p>Just text.</p></body></html>");
        let id = dom.query("p")[0];
        assert_eq!(classify(&dom, id, &Settings::default()), None);
    }

    #[test]
    fn test_generic_hidden_element_not_reported() {
        let dom = host(r#"<html><body><div style="display: none">secret</div></body></html>"#);
        let id = dom.query("div")[0];
        assert_eq!(classify(&dom, id, &Settings::default()), None);
    }

    #[test]
    fn test_structural_tags_never_classify_hidden() {
        // The root has no layout parent and contains an input, so without
        // the scaffolding exclusion it would read as a hidden form.
        let dom = host(r#"<html><body><input name="q"></body></html>"#);
        let root = dom.query("html")[0];
        assert_eq!(classify(&dom, root, &Settings::default()), None);
    }
}
