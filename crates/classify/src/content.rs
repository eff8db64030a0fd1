use pagelens_core::sanitize::sanitize_text;
use pagelens_core::{
    Category, Classification, FormPurpose, HiddenKind, LinkDirection, MatchMethod, TooltipContent,
};

/// Renders a classification into structured tooltip content. Everything
/// shown here comes from the classification itself.
pub fn tooltip_content(classification: &Classification) -> TooltipContent {
    match classification {
        Classification::Ad { network } => {
            TooltipContent::new("Advertisement", Category::Ad)
                .field("Ad Network", network.as_deref().unwrap_or("Unknown"))
                .field(
                    "Privacy Notice",
                    "This content may track your browsing activity",
                )
        }
        Classification::Link {
            direction,
            secure,
            download,
            host,
            path,
        } => {
            let external = *direction == LinkDirection::External;
            let title = if *download {
                "Download"
            } else if external {
                "External Link"
            } else {
                "Internal Link"
            };
            let mut content = TooltipContent::new(title, classification.category())
                .field("Destination", sanitize_text(&format!("{host}{path}"), 100));
            if !secure {
                content = content.warning("Not HTTPS");
            }
            if external {
                content = content.note("Leaving current site");
            }
            content
        }
        Classification::Form {
            purpose,
            action,
            total_fields,
            required_fields,
            secure,
            security_risk,
            ..
        } => {
            let title = match purpose {
                FormPurpose::General => "General Form".to_string(),
                p => format!("{p} Form"),
            };
            let mut content = TooltipContent::new(title, Category::Form)
                .field(
                    "Fields",
                    format!("{total_fields} total, {required_fields} required"),
                )
                .field("Destination", sanitize_text(action, 100));
            if *security_risk {
                content = content.warning("SECURITY RISK: Sensitive data over HTTP");
            }
            if *secure {
                content = content.note("Secure (HTTPS)");
            }
            content
        }
        Classification::Hidden { hidden_kind, tag } => {
            let mut content = TooltipContent::new(hidden_kind.to_string(), Category::Hidden)
                .field("Element", format!("<{tag}>"))
                .note("This element is hidden from view but present in the page");
            if *hidden_kind == HiddenKind::TrackingPixel {
                content = content.warning("May be tracking your activity");
            }
            content
        }
        Classification::LookOutMatch {
            criteria_id,
            relevance,
            method,
            explanation,
        } => {
            let mut content = TooltipContent::new("Look Out Match", Category::LookOut)
                .field("Criteria", criteria_id.clone())
                .field("Relevance", format!("{relevance}% match"))
                .field(
                    "Method",
                    match method {
                        MatchMethod::Basic => "keyword",
                        MatchMethod::Ai => "ai",
                    },
                )
                .note("This content matches your Look Out criteria");
            content.insight = explanation.clone();
            content
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelens_core::LinkDirection;

    #[test]
    fn test_external_insecure_link_markers() {
        let content = tooltip_content(&Classification::Link {
            direction: LinkDirection::External,
            secure: false,
            download: false,
            host: "example.com".into(),
            path: "/x".into(),
        });
        assert_eq!(content.title, "External Link");
        assert!(content.warnings.iter().any(|w| w.contains("Not HTTPS")));
        assert!(content.notes.iter().any(|n| n.contains("Leaving current site")));
        assert_eq!(content.fields[0].value, "example.com/x");
    }

    #[test]
    fn test_form_risk_warning() {
        let content = tooltip_content(&Classification::Form {
            purpose: FormPurpose::Login,
            action: "http://mysite.com/login".into(),
            total_fields: 2,
            required_fields: 1,
            sensitive_fields: vec!["Password".into()],
            secure: false,
            security_risk: true,
        });
        assert_eq!(content.title, "Login Form");
        assert_eq!(content.fields[0].value, "2 total, 1 required");
        assert!(content.warnings[0].contains("SECURITY RISK"));
        assert!(content.notes.is_empty());
    }

    #[test]
    fn test_tracking_pixel_warning() {
        let content = tooltip_content(&Classification::Hidden {
            hidden_kind: HiddenKind::TrackingPixel,
            tag: "img".into(),
        });
        assert_eq!(content.title, "Tracking Pixel");
        assert_eq!(content.fields[0].value, "<img>");
        assert!(!content.warnings.is_empty());
    }

    #[test]
    fn test_download_title() {
        let content = tooltip_content(&Classification::Link {
            direction: LinkDirection::Internal,
            secure: true,
            download: true,
            host: "mysite.com".into(),
            path: "/report.pdf".into(),
        });
        assert_eq!(content.title, "Download");
        assert!(content.warnings.is_empty());
    }
}
