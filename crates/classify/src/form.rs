use once_cell::sync::Lazy;
use regex::Regex;

use pagelens_core::sanitize::{sanitize_text, MAX_LABEL_LENGTH};
use pagelens_core::{Classification, FormPurpose};
use pagelens_dom::{DomHost, NodeId};

/// Input types or name/label keywords that mark a field as sensitive.
static SENSITIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)password|credit|card|cvv|ssn|social").unwrap());

const PURPOSE_KEYWORDS: &[(FormPurpose, &[&str])] = &[
    (FormPurpose::Login, &["login", "sign in"]),
    (FormPurpose::Registration, &["register", "sign up"]),
    (FormPurpose::Payment, &["payment", "credit card"]),
    (FormPurpose::Search, &["search"]),
    (FormPurpose::Contact, &["contact", "message"]),
];

pub fn analyze_form(host: &dyn DomHost, id: NodeId) -> Classification {
    let action = form_action(host, id);
    let secure = action.starts_with("https://");

    let inputs = host.query_within(id, "input, textarea, select");
    let total_fields = inputs.len();
    let required_fields = host.query_within(id, "[required]").len();

    let purpose = detect_purpose(&host.text(id));
    let sensitive_fields = sensitive_fields(host, &inputs);
    let security_risk = !sensitive_fields.is_empty() && !secure;

    Classification::Form {
        purpose,
        action,
        total_fields,
        required_fields,
        sensitive_fields,
        secure,
        security_risk,
    }
}

/// The form's submission URL, resolved against the document. A missing
/// or unresolvable action submits to the page itself.
pub fn form_action(host: &dyn DomHost, id: NodeId) -> String {
    match host.attr(id, "action") {
        Some(action) if !action.trim().is_empty() => host
            .base_url()
            .join(action.trim())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| host.base_url().to_string()),
        _ => host.base_url().to_string(),
    }
}

/// First purpose whose keyword set appears in the form text wins.
pub fn detect_purpose(text: &str) -> FormPurpose {
    let text = text.to_lowercase();
    for (purpose, keywords) in PURPOSE_KEYWORDS {
        if keywords.iter().any(|k| text.contains(k)) {
            return *purpose;
        }
    }
    FormPurpose::General
}

/// Labels of the sensitive fields, each capped for display and prompts.
fn sensitive_fields(host: &dyn DomHost, inputs: &[NodeId]) -> Vec<String> {
    let mut fields = Vec::new();
    for &input in inputs {
        let ty = host.attr(input, "type").unwrap_or_default().to_lowercase();
        let name = host.attr(input, "name").unwrap_or_default();
        let label = input_label(host, input);
        if ty == "password" || SENSITIVE.is_match(&name) || SENSITIVE.is_match(&label) {
            fields.push(sanitize_text(&label, MAX_LABEL_LENGTH));
        }
    }
    fields
}

/// Resolves a human-readable label for an input: a `label[for]` element,
/// an enclosing label, then placeholder, name, type, and a fixed
/// fallback, in that order.
pub fn input_label(host: &dyn DomHost, input: NodeId) -> String {
    if let Some(input_id) = host.attr(input, "id") {
        let selector = format!("label[for=\"{}\"]", input_id);
        if let Some(&label) = host.query(&selector).first() {
            let text = host.text(label).trim().to_string();
            if !text.is_empty() {
                return text;
            }
        }
    }

    let mut current = host.parent(input);
    while let Some(node) = current {
        if host.tag(node).as_deref() == Some("label") {
            let text = host.text(node).trim().to_string();
            if !text.is_empty() {
                return text;
            }
            break;
        }
        current = host.parent(node);
    }

    for attr in ["placeholder", "name", "type"] {
        if let Some(value) = host.attr(input, attr) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    "Input field".to_string()
}
