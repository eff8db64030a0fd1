use serde_json::json;

use pagelens_core::sanitize::escape_html;
use pagelens_core::{Category, Config, Paths, TooltipContent};
use pagelens_dom::DomHost;
use pagelens_overlay::{classify_page, ScanEntry};
use pagelens_theme::{colors, effective_variant, sample_variant};

use super::page;

pub async fn run(target: &str, format: &str, output: Option<String>) -> anyhow::Result<()> {
    let config = Config::load_or_default(&Paths::new())?;
    let dom = page::load_document(target).await?;

    let entries = classify_page(&dom, &config.settings);
    let variant = effective_variant(config.settings.theme.mode, sample_variant(&dom));

    let rendered = match format {
        "text" => render_text(&dom, &entries, variant),
        "json" => render_json(&dom, &entries, variant)?,
        "html" => render_html(&dom, &entries, variant, &config),
        other => anyhow::bail!("Unknown format: {} (expected text, json, or html)", other),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            println!("✓ Report written to {}", path);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn count_line(entries: &[ScanEntry]) -> String {
    let order = [
        Category::Ad,
        Category::LinkInternal,
        Category::LinkExternal,
        Category::Form,
        Category::Hidden,
        Category::LookOut,
    ];
    let parts: Vec<String> = order
        .iter()
        .filter_map(|cat| {
            let n = entries
                .iter()
                .filter(|e| e.classification.category() == *cat)
                .count();
            if n > 0 {
                Some(format!("{} {}", n, cat))
            } else {
                None
            }
        })
        .collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

fn render_text(
    dom: &dyn DomHost,
    entries: &[ScanEntry],
    variant: pagelens_core::Variant,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Scanned {} — {} annotated element{} (variant: {})\n",
        dom.base_url(),
        entries.len(),
        if entries.len() == 1 { "" } else { "s" },
        variant
    ));

    if entries.is_empty() {
        return out;
    }
    out.push('\n');

    let rows: Vec<(String, String, TooltipContent)> = entries
        .iter()
        .map(|e| {
            (
                format!("[{}]", e.classification.category()),
                page::describe(dom, e.node),
                pagelens_classify::tooltip_content(&e.classification),
            )
        })
        .collect();

    let cat_width = rows.iter().map(|(c, _, _)| c.len()).max().unwrap_or(0);
    let desc_width = rows.iter().map(|(_, d, _)| d.len()).max().unwrap_or(0);

    for (entry, (cat, desc, content)) in entries.iter().zip(&rows) {
        out.push_str(&format!(
            "  {:<cw$}  {:<dw$}  {}",
            cat,
            desc,
            content.title,
            cw = cat_width,
            dw = desc_width
        ));
        if !entry.indicator {
            out.push_str("  (no indicator)");
        }
        for warning in &content.warnings {
            out.push_str(&format!("  ⚠ {}", warning));
        }
        out.push('\n');
    }

    out.push_str(&format!("\nCounts: {}\n", count_line(entries)));
    out
}

fn render_json(
    dom: &dyn DomHost,
    entries: &[ScanEntry],
    variant: pagelens_core::Variant,
) -> anyhow::Result<String> {
    let elements: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            json!({
                "node": e.node,
                "descriptor": page::describe(dom, e.node),
                "indicator": e.indicator,
                "classification": &e.classification,
                "tooltip": pagelens_classify::tooltip_content(&e.classification),
            })
        })
        .collect();

    let report = json!({
        "url": dom.base_url().to_string(),
        "variant": variant,
        "elementCount": entries.len(),
        "elements": elements,
    });
    Ok(format!("{}\n", serde_json::to_string_pretty(&report)?))
}

fn render_html(
    dom: &dyn DomHost,
    entries: &[ScanEntry],
    variant: pagelens_core::Variant,
    config: &Config,
) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>PageLens report</title>\n<style>\n");
    html.push_str(
        "body { font-family: -apple-system, sans-serif; max-width: 720px; margin: 2rem auto; }\n\
         .meta { color: #666; }\n\
         .entry { border: 1px solid #ddd; border-radius: 6px; padding: 0.75rem; margin: 0.5rem 0; }\n\
         .badge { display: inline-block; padding: 1px 8px; border-radius: 9px; font-size: 12px; }\n\
         .field { color: #444; margin: 0.15rem 0; }\n\
         .warning { color: #b45309; margin: 0.15rem 0; }\n\
         .note { color: #666; margin: 0.15rem 0; }\n",
    );
    html.push_str("</style>\n</head>\n<body>\n<h1>PageLens report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} · {} element{} · {} variant</p>\n",
        escape_html(dom.base_url().as_str()),
        entries.len(),
        if entries.len() == 1 { "" } else { "s" },
        variant
    ));

    for entry in entries {
        let category = entry.classification.category();
        let triple = colors(&config.settings.theme, category, variant);
        let content = pagelens_classify::tooltip_content(&entry.classification);

        html.push_str("<div class=\"entry\">\n");
        html.push_str(&format!(
            "<span class=\"badge\" style=\"background:{};color:{};border:1px solid {}\">{}</span>\n",
            escape_html(&triple.background),
            escape_html(&triple.text),
            escape_html(&triple.border),
            category
        ));
        html.push_str(&format!(
            " <code>{}</code> <strong>{}</strong>\n",
            escape_html(&page::describe(dom, entry.node)),
            escape_html(&content.title)
        ));
        for field in &content.fields {
            html.push_str(&format!(
                "<p class=\"field\">{}: {}</p>\n",
                escape_html(&field.label),
                escape_html(&field.value)
            ));
        }
        for warning in &content.warnings {
            html.push_str(&format!(
                "<p class=\"warning\">⚠ {}</p>\n",
                escape_html(warning)
            ));
        }
        for note in &content.notes {
            html.push_str(&format!("<p class=\"note\">{}</p>\n", escape_html(note)));
        }
        html.push_str("</div>\n");
    }

    html.push_str(&format!(
        "<p class=\"meta\">Counts: {}</p>\n</body>\n</html>\n",
        count_line(entries)
    ));
    html
}
