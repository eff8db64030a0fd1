use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use pagelens_core::{Error, Result};

use crate::geometry::{BoundingBox, ViewportInfo};
use crate::style::{parse_css_color, parse_inline_style, parse_length, ComputedStyle, Rgba};
use crate::{DomHost, NodeId};

static NEXT_DOC: AtomicU64 = AtomicU64::new(1);

const BLOCK_TAGS: &[&str] = &[
    "html", "body", "div", "p", "section", "article", "aside", "header", "footer", "main", "nav",
    "form", "fieldset", "table", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre", "figure", "hr",
];

/// Tags that never render; their default display is none.
const UNRENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "meta", "link", "title", "base",
];

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    style: ComputedStyle,
    bbox: BoundingBox,
    collapsed: bool,
}

/// Offline document host backed by an HTML parse. Layout is synthesized,
/// not computed: block elements stack vertically with tag-based default
/// sizes, inline styles and img/iframe size attributes are honored, and
/// `display:none` subtrees collapse to zero boxes. Good enough to drive
/// the geometry-dependent heuristics deterministically.
///
/// The parsed document type is single-threaded, so parses happen in
/// tight scopes and everything kept is owned; selector queries re-parse
/// the stored source, which yields identical node ordering.
pub struct StaticDom {
    source: String,
    base: Url,
    viewport: ViewportInfo,
    doc: u64,
    nodes: Vec<NodeData>,
}

impl StaticDom {
    pub fn parse(html: &str, document_url: &str) -> Result<Self> {
        Self::parse_with_viewport(html, document_url, ViewportInfo::default())
    }

    pub fn parse_with_viewport(
        html: &str,
        document_url: &str,
        viewport: ViewportInfo,
    ) -> Result<Self> {
        let base = Url::parse(document_url)
            .map_err(|e| Error::Dom(format!("invalid document URL {document_url}: {e}")))?;
        let doc = NEXT_DOC.fetch_add(1, Ordering::Relaxed);

        let mut nodes = extract_nodes(html);
        resolve_styles(&mut nodes);
        synthesize_layout(&mut nodes, &viewport);
        debug!(doc, elements = nodes.len(), url = %base, "Parsed document");

        Ok(Self {
            source: html.to_string(),
            base,
            viewport,
            doc,
            nodes,
        })
    }

    fn get(&self, id: NodeId) -> Option<&NodeData> {
        if id.doc != self.doc {
            return None;
        }
        self.nodes.get(id.index as usize)
    }

    fn node_id(&self, index: usize) -> NodeId {
        NodeId {
            doc: self.doc,
            index: index as u64,
        }
    }

    /// Runs a selector group against a fresh parse of the stored source
    /// and maps matches back to document-order indices.
    fn select_indices(&self, root: Option<usize>, selector: &str) -> Vec<usize> {
        let parsed = match Selector::parse(selector) {
            Ok(s) => s,
            Err(e) => {
                warn!(selector, error = %e, "Unparseable selector, returning no matches");
                return Vec::new();
            }
        };

        let html = Html::parse_document(&self.source);
        let mut index_of = HashMap::new();
        for (idx, node) in html
            .tree
            .root()
            .descendants()
            .filter(|n| n.value().is_element())
            .enumerate()
        {
            index_of.insert(node.id(), idx);
        }

        let mut out = Vec::new();
        match root {
            None => {
                for el in html.select(&parsed) {
                    if let Some(&idx) = index_of.get(&el.id()) {
                        out.push(idx);
                    }
                }
            }
            Some(root_idx) => {
                // Find the ego node carrying this document-order index,
                // then select below it.
                let root_ref = html
                    .tree
                    .root()
                    .descendants()
                    .filter(|n| n.value().is_element())
                    .nth(root_idx);
                if let Some(root_ref) = root_ref {
                    if let Some(root_el) = scraper::ElementRef::wrap(root_ref) {
                        for el in root_el.select(&parsed) {
                            if let Some(&idx) = index_of.get(&el.id()) {
                                out.push(idx);
                            }
                        }
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }
}

impl DomHost for StaticDom {
    fn base_url(&self) -> &Url {
        &self.base
    }

    fn viewport(&self) -> ViewportInfo {
        self.viewport
    }

    fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn tag(&self, id: NodeId) -> Option<String> {
        self.get(id).map(|n| n.tag.clone())
    }

    fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        let node = self.get(id)?;
        node.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    fn attrs(&self, id: NodeId) -> Vec<(String, String)> {
        self.get(id).map(|n| n.attrs.clone()).unwrap_or_default()
    }

    fn text(&self, id: NodeId) -> String {
        self.get(id).map(|n| n.text.clone()).unwrap_or_default()
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id)
            .map(|n| n.children.iter().map(|&c| self.node_id(c)).collect())
            .unwrap_or_default()
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent.map(|p| self.node_id(p))
    }

    fn style(&self, id: NodeId) -> Option<ComputedStyle> {
        self.get(id).map(|n| n.style.clone())
    }

    fn bounding_box(&self, id: NodeId) -> Option<BoundingBox> {
        self.get(id).map(|n| n.bbox)
    }

    fn layout_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        if node.collapsed || node.style.position == "fixed" {
            return None;
        }
        node.parent.map(|p| self.node_id(p))
    }

    fn query(&self, selector: &str) -> Vec<NodeId> {
        self.select_indices(None, selector)
            .into_iter()
            .map(|i| self.node_id(i))
            .collect()
    }

    fn query_within(&self, id: NodeId, selector: &str) -> Vec<NodeId> {
        if self.get(id).is_none() {
            return Vec::new();
        }
        self.select_indices(Some(id.index as usize), selector)
            .into_iter()
            .map(|i| self.node_id(i))
            .collect()
    }

    fn background_at(&self, x: f64, y: f64) -> Option<Rgba> {
        // Later elements paint over earlier ones; walk back to front.
        for node in self.nodes.iter().rev() {
            if node.collapsed {
                continue;
            }
            let Some(color) = node.style.background_color else {
                continue;
            };
            if color.is_transparent() {
                continue;
            }
            if node.bbox.contains(x, y) {
                return Some(color);
            }
        }
        None
    }
}

fn extract_nodes(html: &str) -> Vec<NodeData> {
    let parsed = Html::parse_document(html);
    let mut nodes = Vec::new();
    let mut index_of = HashMap::new();

    for node in parsed
        .tree
        .root()
        .descendants()
        .filter(|n| n.value().is_element())
    {
        let Some(el) = scraper::ElementRef::wrap(node) else {
            continue;
        };
        let idx = nodes.len();
        index_of.insert(node.id(), idx);

        let parent = node
            .ancestors()
            .find(|a| a.value().is_element())
            .and_then(|a| index_of.get(&a.id()).copied());

        let attrs: Vec<(String, String)> = el
            .value()
            .attrs()
            .map(|(k, v)| (k.to_lowercase(), v.to_string()))
            .collect();

        nodes.push(NodeData {
            tag: el.value().name().to_lowercase(),
            attrs,
            text: el.text().collect::<String>(),
            parent,
            children: Vec::new(),
            style: ComputedStyle::default(),
            bbox: BoundingBox::default(),
            collapsed: false,
        });

        if let Some(p) = parent {
            nodes[p].children.push(idx);
        }
    }
    nodes
}

fn attr_value<'a>(node: &'a NodeData, name: &str) -> Option<&'a str> {
    node.attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn is_block(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

fn is_unrendered(tag: &str) -> bool {
    UNRENDERED_TAGS.contains(&tag)
}

/// Fills in computed styles: inline declarations over tag defaults, with
/// visibility inherited from the parent chain (parents come first in
/// document order, so one forward pass suffices).
fn resolve_styles(nodes: &mut Vec<NodeData>) {
    for idx in 0..nodes.len() {
        let mut style = ComputedStyle {
            display: if is_unrendered(&nodes[idx].tag) {
                "none".to_string()
            } else if is_block(&nodes[idx].tag) {
                "block".to_string()
            } else {
                "inline".to_string()
            },
            ..ComputedStyle::default()
        };

        if let Some(parent) = nodes[idx].parent {
            style.visibility = nodes[parent].style.visibility.clone();
        }

        if attr_value(&nodes[idx], "hidden").is_some() {
            style.display = "none".to_string();
        }
        if nodes[idx].tag == "input"
            && attr_value(&nodes[idx], "type").is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
        {
            style.display = "none".to_string();
        }

        if let Some(inline) = attr_value(&nodes[idx], "style") {
            for (prop, value) in parse_inline_style(inline) {
                match prop.as_str() {
                    "display" => style.display = value.to_lowercase(),
                    "visibility" => style.visibility = value.to_lowercase(),
                    "opacity" => {
                        if let Ok(v) = value.parse::<f64>() {
                            style.opacity = v.clamp(0.0, 1.0);
                        }
                    }
                    "position" => style.position = value.to_lowercase(),
                    "background-color" | "background" => {
                        if let Some(color) = parse_css_color(&value) {
                            style.background_color = Some(color);
                        }
                    }
                    _ => {}
                }
            }
        }

        let collapsed = style.display == "none"
            || nodes[idx]
                .parent
                .is_some_and(|p| nodes[p].collapsed);

        nodes[idx].style = style;
        nodes[idx].collapsed = collapsed;
    }
}

fn default_size(node: &NodeData, vp: &ViewportInfo) -> (f64, f64) {
    let text_len = node.text.trim().chars().count() as f64;
    match node.tag.as_str() {
        "img" => (64.0, 64.0),
        "iframe" => (300.0, 150.0),
        "input" | "select" | "button" => (150.0, 24.0),
        "textarea" => (150.0, 60.0),
        t if is_block(t) => (vp.width as f64, 20.0),
        _ => ((text_len * 8.0).min(vp.width as f64), 16.0),
    }
}

fn styled_length(node: &NodeData, prop: &str, base: f64) -> Option<f64> {
    let inline = attr_value(node, "style")?;
    parse_inline_style(inline)
        .into_iter()
        .find(|(p, _)| p == prop)
        .and_then(|(_, v)| parse_length(&v, base))
}

fn attr_length(node: &NodeData, name: &str, base: f64) -> Option<f64> {
    attr_value(node, name).and_then(|v| parse_length(v, base))
}

/// One forward pass assigning boxes: blocks stack at an advancing
/// cursor, inline elements sit at their parent's position, out-of-flow
/// elements honor explicit top/left. The root and body are stretched to
/// cover the laid-out extent afterwards so point sampling has a floor.
fn synthesize_layout(nodes: &mut Vec<NodeData>, vp: &ViewportInfo) {
    let mut cursor_y = 0.0_f64;

    for idx in 0..nodes.len() {
        if nodes[idx].collapsed {
            nodes[idx].bbox = BoundingBox::default();
            continue;
        }

        let (default_w, default_h) = default_size(&nodes[idx], vp);
        let width = styled_length(&nodes[idx], "width", vp.width as f64)
            .or_else(|| attr_length(&nodes[idx], "width", vp.width as f64))
            .unwrap_or(default_w);
        let height = styled_length(&nodes[idx], "height", vp.height as f64)
            .or_else(|| attr_length(&nodes[idx], "height", vp.height as f64))
            .unwrap_or(default_h);

        let out_of_flow = nodes[idx].style.is_out_of_flow();
        let (x, y) = if out_of_flow {
            (
                styled_length(&nodes[idx], "left", vp.width as f64).unwrap_or(0.0),
                styled_length(&nodes[idx], "top", vp.height as f64).unwrap_or(0.0),
            )
        } else if is_block(&nodes[idx].tag) || nodes[idx].style.display == "block" {
            let y = cursor_y;
            cursor_y += height;
            (0.0, y)
        } else {
            nodes[idx]
                .parent
                .map(|p| (nodes[p].bbox.x, nodes[p].bbox.y))
                .unwrap_or((0.0, 0.0))
        };

        nodes[idx].bbox = BoundingBox::new(x, y, width, height);
    }

    let extent = cursor_y.max(vp.height as f64);
    for node in nodes.iter_mut() {
        if (node.tag == "html" || node.tag == "body") && !node.collapsed {
            node.bbox.x = 0.0;
            node.bbox.y = 0.0;
            node.bbox.width = vp.width as f64;
            node.bbox.height = extent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom(html: &str) -> StaticDom {
        StaticDom::parse(html, "https://mysite.com/page").unwrap()
    }

    #[test]
    fn test_query_and_attrs() {
        let d = dom(r#"<div id="a" class="promo box"><a href="/x">link</a></div>"#);
        let divs = d.query("div#a");
        assert_eq!(divs.len(), 1);
        assert_eq!(d.attr(divs[0], "class").as_deref(), Some("promo box"));
        assert_eq!(d.tag(divs[0]).as_deref(), Some("div"));

        let anchors = d.query("a[href]");
        assert_eq!(anchors.len(), 1);
        assert_eq!(d.text(anchors[0]), "link");
    }

    #[test]
    fn test_stale_handles_from_other_document() {
        let d1 = dom("<p>one</p>");
        let d2 = dom("<p>two</p>");
        let p1 = d1.query("p")[0];
        assert!(d1.contains(p1));
        assert!(!d2.contains(p1));
        assert!(d2.bounding_box(p1).is_none());
        assert!(d2.style(p1).is_none());
    }

    #[test]
    fn test_display_none_collapses_subtree() {
        let d = dom(r#"<div style="display:none"><span id="inner">x</span></div>"#);
        let inner = d.query("#inner")[0];
        let boxed = d.bounding_box(inner).unwrap();
        assert!(boxed.is_empty());
        assert!(d.layout_parent(inner).is_none());
        // Own computed display stays inline; only the box collapses.
        assert_eq!(d.style(inner).unwrap().display, "inline");
    }

    #[test]
    fn test_visibility_inherits() {
        let d = dom(r#"<div style="visibility:hidden"><span id="s">x</span></div>"#);
        let s = d.query("#s")[0];
        assert_eq!(d.style(s).unwrap().visibility, "hidden");
    }

    #[test]
    fn test_size_attributes_and_styles() {
        let d = dom(
            r#"<img id="px" width="1" height="1">
               <iframe id="fr"></iframe>
               <div id="sized" style="width:200px;height:50px"></div>"#,
        );
        let px = d.query("#px")[0];
        let b = d.bounding_box(px).unwrap();
        assert_eq!((b.width, b.height), (1.0, 1.0));

        let fr = d.query("#fr")[0];
        let b = d.bounding_box(fr).unwrap();
        assert_eq!((b.width, b.height), (300.0, 150.0));

        let sized = d.query("#sized")[0];
        let b = d.bounding_box(sized).unwrap();
        assert_eq!((b.width, b.height), (200.0, 50.0));
    }

    #[test]
    fn test_blocks_stack_vertically() {
        let d = dom(r#"<div id="a">a</div><div id="b">b</div>"#);
        let a = d.bounding_box(d.query("#a")[0]).unwrap();
        let b = d.bounding_box(d.query("#b")[0]).unwrap();
        assert!(b.y >= a.bottom());
    }

    #[test]
    fn test_fixed_position_honors_top_left() {
        let d = dom(r#"<div id="f" style="position:fixed;top:40px;left:30px;width:10px;height:10px"></div>"#);
        let f = d.query("#f")[0];
        let b = d.bounding_box(f).unwrap();
        assert_eq!((b.x, b.y), (30.0, 40.0));
        // Fixed elements report no layout parent.
        assert!(d.layout_parent(f).is_none());
    }

    #[test]
    fn test_background_at_prefers_topmost() {
        let d = dom(
            r#"<body style="background-color:#000">
                 <div style="position:absolute;top:0;left:0;width:100px;height:100px;background-color:#fff"></div>
               </body>"#,
        );
        let white = d.background_at(50.0, 50.0).unwrap();
        assert_eq!((white.r, white.g, white.b), (255, 255, 255));
        let black = d.background_at(500.0, 500.0).unwrap();
        assert_eq!((black.r, black.g, black.b), (0, 0, 0));
    }

    #[test]
    fn test_query_within() {
        let d = dom(r#"<form id="f"><input name="a"><input name="b"></form><input name="c">"#);
        let form = d.query("#f")[0];
        assert_eq!(d.query_within(form, "input").len(), 2);
        assert_eq!(d.query("input").len(), 3);
    }

    #[test]
    fn test_invalid_selector_is_empty() {
        let d = dom("<p>x</p>");
        assert!(d.query("p[[").is_empty());
    }

    #[test]
    fn test_origin_helpers() {
        let d = dom("<p>x</p>");
        assert_eq!(d.origin(), "https://mysite.com");
        assert!(d.is_secure());
    }
}
