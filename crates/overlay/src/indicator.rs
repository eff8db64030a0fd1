use std::collections::BTreeMap;

use serde::Serialize;

use pagelens_core::Category;
use pagelens_dom::{BoundingBox, NodeId};

/// One on-page badge: which element owns it, what it marks, and where
/// it anchored when the owning scan pass measured the element. The
/// anchor is never assumed stable across document changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRecord {
    pub node: NodeId,
    pub category: Category,
    pub badge_id: String,
    pub anchor: BoundingBox,
}

/// The overlay's badge bookkeeping, a side map keyed by element handle.
/// Only the overlay engine mutates it, and only by clearing and
/// rebuilding, so after any pass it holds exactly the qualifying
/// elements and nothing else.
#[derive(Debug, Default)]
pub struct IndicatorSet {
    records: BTreeMap<NodeId, IndicatorRecord>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// First claim wins; a later category never displaces an earlier
    /// one within a pass.
    pub fn insert(&mut self, record: IndicatorRecord) -> bool {
        if self.records.contains_key(&record.node) {
            return false;
        }
        self.records.insert(record.node, record);
        true
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    pub fn get(&self, node: NodeId) -> Option<&IndicatorRecord> {
        self.records.get(&node)
    }

    /// Records in document order.
    pub fn iter(&self) -> impl Iterator<Item = &IndicatorRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, category: Category) -> usize {
        self.records
            .values()
            .filter(|r| r.category == category)
            .count()
    }
}
