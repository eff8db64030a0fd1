use std::sync::Arc;

use serde_json::json;

use pagelens_classify::insight::{ad_classification, form_security, link_context};
use pagelens_classify::{classify, indicator_visible, tooltip_content, Insight, Severity};
use pagelens_core::{Classification, Config, Paths, TooltipContent};
use pagelens_dom::{BoundingBox, DomHost, NodeId};
use pagelens_overlay::{estimate_size, place, Placement};
use pagelens_providers::ModelGuard;

use super::{page, provider};

struct Report {
    node: NodeId,
    descriptor: String,
    classification: Option<Classification>,
    content: Option<TooltipContent>,
    indicator: bool,
    bbox: Option<BoundingBox>,
    placement: Option<Placement>,
    insight: Option<Insight>,
}

pub async fn run(target: &str, selector: &str, ai: bool, json_out: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(&Paths::new())?;
    let dom = page::load_document(target).await?;

    let matches = dom.query(selector);
    if matches.is_empty() {
        println!("No elements match `{}`", selector);
        return Ok(());
    }

    // The --ai flag asks explicitly, so the config toggle does not gate it.
    let guard = if ai {
        Some(Arc::new(ModelGuard::new(
            provider::probe_model().await,
            &config.tuning,
        )))
    } else {
        None
    };

    let mut reports = Vec::new();
    for id in matches {
        reports.push(inspect_node(&dom, id, &config, guard.as_deref()).await);
    }

    if json_out {
        print!("{}", render_json(&reports)?);
    } else {
        print!("{}", render_text(&reports));
    }
    Ok(())
}

async fn inspect_node(
    dom: &dyn DomHost,
    id: NodeId,
    config: &Config,
    guard: Option<&ModelGuard>,
) -> Report {
    let classification = classify(dom, id, &config.settings);

    let insight = match (guard, &classification) {
        (Some(guard), Some(c)) => run_insight(dom, id, c, guard).await,
        _ => None,
    };

    let content = classification.as_ref().map(|c| {
        let mut content = tooltip_content(c);
        if let Some(insight) = &insight {
            content.insight = Some(insight.message.clone());
        }
        content
    });

    let bbox = dom.bounding_box(id);
    let placement = match (&content, &bbox) {
        (Some(content), Some(rect)) => {
            Some(place(rect, estimate_size(content), &dom.viewport()))
        }
        _ => None,
    };

    Report {
        node: id,
        descriptor: page::describe(dom, id),
        indicator: classification.is_some() && indicator_visible(dom, id),
        classification,
        content,
        bbox,
        placement,
        insight,
    }
}

async fn run_insight(
    host: &dyn DomHost,
    id: NodeId,
    classification: &Classification,
    guard: &ModelGuard,
) -> Option<Insight> {
    match classification {
        Classification::Ad { .. } => ad_classification(host, id, guard).await,
        Classification::Link { .. } => link_context(host, id, guard).await,
        Classification::Form { .. } => form_security(host, id, guard).await,
        _ => None,
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::High => "high",
    }
}

fn render_text(reports: &[Report]) -> String {
    let mut out = String::new();
    for report in reports {
        match &report.classification {
            Some(c) => {
                out.push_str(&format!(
                    "{}  [{}]\n",
                    report.descriptor,
                    c.category()
                ));
            }
            None => {
                out.push_str(&format!("{}  (not annotated)\n", report.descriptor));
            }
        }

        if let Some(content) = &report.content {
            out.push_str(&format!("  {}\n", content.title));
            for field in &content.fields {
                out.push_str(&format!("  {}: {}\n", field.label, field.value));
            }
            for warning in &content.warnings {
                out.push_str(&format!("  ⚠ {}\n", warning));
            }
            for note in &content.notes {
                out.push_str(&format!("  {}\n", note));
            }
            out.push_str(&format!(
                "  Indicator: {}\n",
                if report.indicator { "shown" } else { "suppressed" }
            ));
        }

        if let Some(rect) = &report.bbox {
            out.push_str(&format!(
                "  Box: {:.0}×{:.0} at ({:.0}, {:.0})\n",
                rect.width, rect.height, rect.x, rect.y
            ));
        }
        if let Some(p) = &report.placement {
            out.push_str(&format!(
                "  Tooltip: {:.0}×{:.0} at ({:.0}, {:.0}) {}\n",
                p.width,
                p.height,
                p.x,
                p.y,
                if p.below { "below" } else { "above" }
            ));
        }
        if let Some(insight) = &report.insight {
            out.push_str(&format!(
                "  AI [{}]: {}\n",
                severity_label(insight.severity),
                insight.message
            ));
        }
        out.push('\n');
    }
    out
}

fn render_json(reports: &[Report]) -> anyhow::Result<String> {
    let values: Vec<serde_json::Value> = reports
        .iter()
        .map(|r| {
            json!({
                "node": r.node,
                "descriptor": &r.descriptor,
                "classification": &r.classification,
                "tooltip": &r.content,
                "indicator": r.indicator,
                "boundingBox": &r.bbox,
                "placement": &r.placement,
                "insight": &r.insight,
            })
        })
        .collect();
    Ok(format!("{}\n", serde_json::to_string_pretty(&values)?))
}
