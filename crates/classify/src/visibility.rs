use pagelens_dom::{DomHost, NodeId};

/// Gate for creating an on-screen indicator. Stricter than `is_hidden`
/// about near-invisibility (opacity under 0.1, boxes with a zero side
/// or with both sides under 5px) but more permissive about layout: a
/// missing layout parent is fine for fixed or absolutely positioned
/// elements. Anything unmeasurable passes, since a missed indicator is
/// worse than a spurious one.
pub fn indicator_visible(host: &dyn DomHost, id: NodeId) -> bool {
    let style = host.style(id);

    if let Some(s) = &style {
        if s.opacity < 0.1 {
            return false;
        }
    }

    match host.bounding_box(id) {
        Some(rect) => {
            if rect.width == 0.0 || rect.height == 0.0 {
                return false;
            }
            if rect.width < 5.0 && rect.height < 5.0 {
                return false;
            }
        }
        None => return true,
    }

    if host.layout_parent(id).is_none() {
        match &style {
            Some(s) if s.is_out_of_flow() => {}
            None => {}
            Some(_) => return false,
        }
    }

    true
}
