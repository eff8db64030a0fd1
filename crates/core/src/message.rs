use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::types::Variant;

/// Request sent into a running engine context. Delivery is best-effort:
/// publishing with nobody listening is not an error on the sender side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContextMessage {
    /// Settings changed somewhere (CLI, external edit); contexts should
    /// adopt the new snapshot and rescan.
    #[serde(rename_all = "camelCase")]
    UpdateSettings { settings: Settings },
    /// Immediate Look Out rescan, bypassing the debounce window.
    RescanLookOut,
    /// Appearance changed (mode flipped or sampling concluded differently).
    #[serde(rename_all = "camelCase")]
    ThemeChanged { variant: Variant },
}

/// Notice published by a running engine for whoever is observing it
/// (status line, badge, logs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineNotice {
    #[serde(rename_all = "camelCase")]
    OverlaySummary {
        ads: usize,
        links: usize,
        forms: usize,
        hidden: usize,
    },
    #[serde(rename_all = "camelCase")]
    LookOutMatches { count: usize },
    #[serde(rename_all = "camelCase")]
    PageVariant { variant: Variant },
}

impl EngineNotice {
    pub fn overlay_total(&self) -> Option<usize> {
        match self {
            EngineNotice::OverlaySummary {
                ads,
                links,
                forms,
                hidden,
            } => Some(ads + links + forms + hidden),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_message_tagged_json() {
        let msg = ContextMessage::RescanLookOut;
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"rescanLookOut"}"#);

        let msg = ContextMessage::ThemeChanged {
            variant: Variant::Dark,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"themeChanged""#));
        assert!(json.contains(r#""variant":"dark""#));
    }

    #[test]
    fn test_overlay_total() {
        let notice = EngineNotice::OverlaySummary {
            ads: 2,
            links: 3,
            forms: 1,
            hidden: 0,
        };
        assert_eq!(notice.overlay_total(), Some(6));
        assert_eq!(EngineNotice::LookOutMatches { count: 4 }.overlay_total(), None);
    }
}
