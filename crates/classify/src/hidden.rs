use pagelens_core::{Classification, HiddenKind};
use pagelens_dom::{DomHost, NodeId};

/// Whether an element is present in the document but not rendered:
/// display none, visibility hidden, zero opacity, an empty box, or no
/// layout parent. An unmeasurable box reads as detached and counts as
/// hidden.
pub fn is_hidden(host: &dyn DomHost, id: NodeId) -> bool {
    if let Some(style) = host.style(id) {
        if style.display == "none" || style.visibility == "hidden" || style.opacity == 0.0 {
            return true;
        }
    }

    match host.bounding_box(id) {
        Some(rect) if rect.width == 0.0 || rect.height == 0.0 => return true,
        Some(_) => {}
        None => return true,
    }

    host.layout_parent(id).is_none()
}

pub fn analyze_hidden(host: &dyn DomHost, id: NodeId) -> Classification {
    Classification::Hidden {
        hidden_kind: hidden_kind(host, id),
        tag: host.tag(id).unwrap_or_default(),
    }
}

/// Subtype of a hidden element. Only the first three kinds are worth
/// reporting; `Other` covers ordinary collapsed content.
pub fn hidden_kind(host: &dyn DomHost, id: NodeId) -> HiddenKind {
    match host.tag(id).as_deref() {
        Some("img") if is_pixel(host, id) => HiddenKind::TrackingPixel,
        Some("iframe") => HiddenKind::HiddenIframe,
        Some("form") => HiddenKind::HiddenForm,
        Some(_) if !host.query_within(id, "input").is_empty() => HiddenKind::HiddenForm,
        _ => HiddenKind::Other,
    }
}

fn is_pixel(host: &dyn DomHost, id: NodeId) -> bool {
    dimension(host, id, "width") == Some(1.0) && dimension(host, id, "height") == Some(1.0)
}

fn dimension(host: &dyn DomHost, id: NodeId, name: &str) -> Option<f64> {
    if let Some(value) = host.attr(id, name) {
        if let Ok(parsed) = value.trim().parse::<f64>() {
            return Some(parsed);
        }
    }
    host.bounding_box(id).map(|rect| match name {
        "width" => rect.width,
        _ => rect.height,
    })
}
