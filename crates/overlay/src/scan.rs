use serde::Serialize;

use pagelens_classify::{classify, indicator_visible};
use pagelens_core::{Classification, Settings};
use pagelens_dom::{DomHost, NodeId};

/// One classified element from a full-document pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    pub node: NodeId,
    pub classification: Classification,
    /// Whether the element passes the indicator visibility gate. The
    /// classification itself is reported either way.
    pub indicator: bool,
}

/// Classifies every element in the document, in document order. Each
/// element gets at most one entry; the classifier's own precedence
/// decides which detector claims it.
pub fn classify_page(host: &dyn DomHost, settings: &Settings) -> Vec<ScanEntry> {
    let mut entries = Vec::new();
    for node in host.query("*") {
        if let Some(classification) = classify(host, node, settings) {
            let indicator = indicator_visible(host, node);
            entries.push(ScanEntry {
                node,
                classification,
                indicator,
            });
        }
    }
    entries
}
