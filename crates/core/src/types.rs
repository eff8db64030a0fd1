use serde::{Deserialize, Serialize};

/// Indicator color category. Doubles as the theme lookup key, so the
/// serialized form is part of the config format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Ad,
    LinkInternal,
    LinkExternal,
    Form,
    Hidden,
    LookOut,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Ad => "ad",
            Category::LinkInternal => "link-internal",
            Category::LinkExternal => "link-external",
            Category::Form => "form",
            Category::Hidden => "hidden",
            Category::LookOut => "look-out",
        };
        write!(f, "{}", s)
    }
}

/// Derived page appearance, distinct from the configured `ThemeMode`:
/// this is what luminance sampling concluded (or a fixed mode forced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    Light,
    Dark,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Light => write!(f, "light"),
            Variant::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkDirection {
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormPurpose {
    Login,
    Registration,
    Payment,
    Search,
    Contact,
    General,
}

impl std::fmt::Display for FormPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FormPurpose::Login => "Login",
            FormPurpose::Registration => "Registration",
            FormPurpose::Payment => "Payment",
            FormPurpose::Search => "Search",
            FormPurpose::Contact => "Contact",
            FormPurpose::General => "General Form",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HiddenKind {
    TrackingPixel,
    HiddenIframe,
    HiddenForm,
    Other,
}

impl std::fmt::Display for HiddenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HiddenKind::TrackingPixel => "Tracking Pixel",
            HiddenKind::HiddenIframe => "Hidden IFrame",
            HiddenKind::HiddenForm => "Hidden Form",
            HiddenKind::Other => "Hidden Element",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMethod {
    Basic,
    Ai,
}

/// What a classifier concluded about one element. Carries everything a
/// tooltip needs so rendering never re-queries the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Classification {
    #[serde(rename_all = "camelCase")]
    Ad { network: Option<String> },
    #[serde(rename_all = "camelCase")]
    Link {
        direction: LinkDirection,
        secure: bool,
        download: bool,
        host: String,
        path: String,
    },
    #[serde(rename_all = "camelCase")]
    Form {
        purpose: FormPurpose,
        action: String,
        total_fields: usize,
        required_fields: usize,
        sensitive_fields: Vec<String>,
        secure: bool,
        security_risk: bool,
    },
    #[serde(rename_all = "camelCase")]
    Hidden { hidden_kind: HiddenKind, tag: String },
    #[serde(rename_all = "camelCase")]
    LookOutMatch {
        criteria_id: String,
        relevance: u8,
        method: MatchMethod,
        explanation: Option<String>,
    },
}

impl Classification {
    pub fn category(&self) -> Category {
        match self {
            Classification::Ad { .. } => Category::Ad,
            Classification::Link { direction, .. } => match direction {
                LinkDirection::Internal => Category::LinkInternal,
                LinkDirection::External => Category::LinkExternal,
            },
            Classification::Form { .. } => Category::Form,
            Classification::Hidden { .. } => Category::Hidden,
            Classification::LookOutMatch { .. } => Category::LookOut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipField {
    pub label: String,
    pub value: String,
}

/// Structured tooltip body. Hosts decide presentation; the engine only
/// decides content and placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipContent {
    pub title: String,
    pub category: Option<Category>,
    #[serde(default)]
    pub fields: Vec<TooltipField>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub insight: Option<String>,
}

impl TooltipContent {
    pub fn new(title: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            category: Some(category),
            ..Default::default()
        }
    }

    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(TooltipField {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    pub fn warning(mut self, text: impl Into<String>) -> Self {
        self.warnings.push(text.into());
        self
    }

    pub fn note(mut self, text: impl Into<String>) -> Self {
        self.notes.push(text.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_categories() {
        let link = Classification::Link {
            direction: LinkDirection::External,
            secure: false,
            download: false,
            host: "example.com".into(),
            path: "/x".into(),
        };
        assert_eq!(link.category(), Category::LinkExternal);

        let ad = Classification::Ad { network: None };
        assert_eq!(ad.category(), Category::Ad);
    }

    #[test]
    fn test_classification_serializes_tagged() {
        let c = Classification::Hidden {
            hidden_kind: HiddenKind::TrackingPixel,
            tag: "img".into(),
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"kind\":\"hidden\""));
        assert!(json.contains("\"hiddenKind\":\"trackingPixel\""));
    }

    #[test]
    fn test_tooltip_content_builder() {
        let content = TooltipContent::new("External Link", Category::LinkExternal)
            .field("Destination", "example.com/x")
            .warning("Not HTTPS")
            .note("Leaving current site");
        assert_eq!(content.fields.len(), 1);
        assert_eq!(content.warnings, vec!["Not HTTPS".to_string()]);
        assert_eq!(content.category, Some(Category::LinkExternal));
    }
}
