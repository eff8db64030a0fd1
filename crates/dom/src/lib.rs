pub mod geometry;
pub mod static_dom;
pub mod style;

use serde::{Deserialize, Serialize};
use url::Url;

pub use geometry::{BoundingBox, ViewportInfo};
pub use static_dom::StaticDom;
pub use style::{parse_css_color, ComputedStyle, Rgba};

/// Handle to an element in a host document. The `doc` component ties the
/// handle to one document generation, so handles from a replaced document
/// never alias into the new one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct NodeId {
    pub doc: u64,
    pub index: u64,
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}@d{}", self.index, self.doc)
    }
}

/// The capability set the annotation engine needs from a document. A
/// handle may go stale at any time; accessors return `None`/empty for
/// stale handles instead of failing.
pub trait DomHost: Send + Sync {
    /// The document URL links and form actions resolve against.
    fn base_url(&self) -> &Url;

    fn viewport(&self) -> ViewportInfo;

    /// Whether the handle still refers to a node of the current document.
    fn contains(&self, id: NodeId) -> bool;

    /// Lowercase tag name.
    fn tag(&self, id: NodeId) -> Option<String>;

    fn attr(&self, id: NodeId, name: &str) -> Option<String>;

    fn attrs(&self, id: NodeId) -> Vec<(String, String)>;

    /// Concatenated text content of the subtree.
    fn text(&self, id: NodeId) -> String;

    fn children(&self, id: NodeId) -> Vec<NodeId>;

    fn parent(&self, id: NodeId) -> Option<NodeId>;

    fn style(&self, id: NodeId) -> Option<ComputedStyle>;

    /// Viewport-relative box. `None` means the element could not be
    /// measured, which gates treat as distinct from a zero-size box.
    fn bounding_box(&self, id: NodeId) -> Option<BoundingBox>;

    /// The element's layout container; `None` for display-none subtrees
    /// and out-of-flow fixed elements, mirroring offset-parent behavior.
    fn layout_parent(&self, id: NodeId) -> Option<NodeId>;

    /// All elements matching a selector group, in document order.
    fn query(&self, selector: &str) -> Vec<NodeId>;

    /// Descendants of `id` matching a selector group.
    fn query_within(&self, id: NodeId, selector: &str) -> Vec<NodeId>;

    /// Effective background color painted at a viewport point, if any.
    fn background_at(&self, x: f64, y: f64) -> Option<Rgba>;

    fn origin(&self) -> String {
        self.base_url().origin().ascii_serialization()
    }

    fn is_secure(&self) -> bool {
        self.base_url().scheme() == "https"
    }
}
