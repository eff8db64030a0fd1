use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Longest element text fed into prompts or tooltips.
pub const MAX_TEXT_LENGTH: usize = 500;
/// Longest URL string shown or prompted.
pub const MAX_URL_LENGTH: usize = 200;
/// Longest field label shown or prompted.
pub const MAX_LABEL_LENGTH: usize = 50;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    // Word chars, whitespace and light punctuation survive; everything
    // else is stripped before text leaves the engine.
    Regex::new(r"[^\w\s\-.,!?@/:]").unwrap()
});

/// Truncates to `max` chars, strips disallowed characters, trims.
pub fn sanitize_text(text: &str, max: usize) -> String {
    let truncated: String = text.chars().take(max).collect();
    DISALLOWED.replace_all(&truncated, "").trim().to_string()
}

/// Reduces a URL to origin + path, truncated. Anything unparseable
/// becomes a placeholder rather than an error.
pub fn sanitize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let combined = format!("{}{}", parsed.origin().ascii_serialization(), parsed.path());
            combined.chars().take(MAX_URL_LENGTH).collect()
        }
        Err(_) => "[Invalid URL]".to_string(),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}
