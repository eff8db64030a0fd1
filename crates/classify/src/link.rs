use pagelens_core::{Classification, LinkDirection};
use pagelens_dom::{DomHost, NodeId};

/// Classifies an anchor by origin comparison and `download` attribute.
/// Returns `None` when there is no resolvable href; malformed URLs are
/// a `None`, never an error.
pub fn analyze_link(host: &dyn DomHost, id: NodeId) -> Option<Classification> {
    let href = host.attr(id, "href")?;
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let url = host.base_url().join(href).ok()?;
    let direction = if url.origin() == host.base_url().origin() {
        LinkDirection::Internal
    } else {
        LinkDirection::External
    };

    Some(Classification::Link {
        direction,
        secure: url.scheme() == "https",
        download: host.attr(id, "download").is_some(),
        host: url.host_str().unwrap_or_default().to_string(),
        path: url.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelens_dom::StaticDom;

    fn classify_href(href: &str) -> Option<Classification> {
        let html = format!(r#"<html><body><a href="{}">click</a></body></html>"#, href);
        let dom = StaticDom::parse(&html, "https://mysite.com/page").unwrap();
        analyze_link(&dom, dom.query("a")[0])
    }

    #[test]
    fn test_external_insecure_link() {
        let c = classify_href("http://example.com/x").unwrap();
        assert_eq!(
            c,
            Classification::Link {
                direction: LinkDirection::External,
                secure: false,
                download: false,
                host: "example.com".into(),
                path: "/x".into(),
            }
        );
    }

    #[test]
    fn test_relative_href_is_internal() {
        let c = classify_href("/about").unwrap();
        match c {
            Classification::Link {
                direction, secure, ..
            } => {
                assert_eq!(direction, LinkDirection::Internal);
                assert!(secure);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_same_host_different_scheme_is_external() {
        let c = classify_href("http://mysite.com/about").unwrap();
        assert!(matches!(
            c,
            Classification::Link {
                direction: LinkDirection::External,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_and_empty_href() {
        let dom = StaticDom::parse(
            r#"<html><body><a name="top">anchor</a><a href="  ">blank</a></body></html>"#,
            "https://mysite.com/",
        )
        .unwrap();
        let anchors = dom.query("a");
        assert_eq!(analyze_link(&dom, anchors[0]), None);
        assert_eq!(analyze_link(&dom, anchors[1]), None);
    }

    #[test]
    fn test_download_attribute() {
        let dom = StaticDom::parse(
            r#"<html><body><a href="/report.pdf" download>get</a></body></html>"#,
            "https://mysite.com/",
        )
        .unwrap();
        let c = analyze_link(&dom, dom.query("a")[0]).unwrap();
        assert!(matches!(c, Classification::Link { download: true, .. }));
    }
}
