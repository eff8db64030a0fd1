use std::sync::Arc;

use pagelens_core::{Classification, Config, Criterion, CriterionKind, MatchMethod, Paths};
use pagelens_dom::DomHost;
use pagelens_lookout::LookOutScanner;
use pagelens_storage::ConfigStore;

use super::{page, provider};

fn parse_kind(kind: &str) -> anyhow::Result<CriterionKind> {
    match kind.to_lowercase().as_str() {
        "job" => Ok(CriterionKind::Job),
        "product" => Ok(CriterionKind::Product),
        "content" => Ok(CriterionKind::Content),
        other => anyhow::bail!(
            "Unknown criterion kind: {} (expected job, product, or content)",
            other
        ),
    }
}

fn kind_label(kind: CriterionKind) -> &'static str {
    match kind {
        CriterionKind::Job => "job",
        CriterionKind::Product => "product",
        CriterionKind::Content => "content",
    }
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn add(
    kind: &str,
    keywords: &str,
    exclude: Option<String>,
    location: Option<String>,
    salary_min: Option<f64>,
    price_max: Option<f64>,
) -> anyhow::Result<()> {
    let kind = parse_kind(kind)?;
    let keywords = parse_keywords(keywords);
    if keywords.is_empty() {
        anyhow::bail!("At least one keyword is required");
    }

    let store = ConfigStore::open(Paths::new())?;
    let id = store.add_criterion(Criterion {
        id: String::new(),
        kind,
        keywords,
        exclude_keywords: exclude.as_deref().map(parse_keywords).unwrap_or_default(),
        location,
        salary_min,
        price_max,
        created_at: None,
    })?;

    println!("✓ Added criterion {}", id);
    if !store.lookout().enabled {
        println!("  Background watching is off. Enable it with `pagelens lookout enable`.");
    }
    Ok(())
}

pub async fn list() -> anyhow::Result<()> {
    let store = ConfigStore::open(Paths::new())?;
    let lookout = store.lookout();

    println!(
        "Look Out: {}",
        if lookout.enabled { "enabled" } else { "disabled" }
    );
    if lookout.criteria.is_empty() {
        println!("No criteria. Add one with `pagelens lookout add --kind job --keywords rust,remote`.");
        return Ok(());
    }

    for criterion in &lookout.criteria {
        println!();
        println!("{}  [{}]", criterion.id, kind_label(criterion.kind));
        println!("  keywords: {}", criterion.keywords.join(", "));
        if !criterion.exclude_keywords.is_empty() {
            println!("  exclude:  {}", criterion.exclude_keywords.join(", "));
        }
        if let Some(location) = &criterion.location {
            println!("  location: {}", location);
        }
        if let Some(min) = criterion.salary_min {
            println!("  salary:   at least {}", min);
        }
        if let Some(max) = criterion.price_max {
            println!("  price:    at most {}", max);
        }
        if let Some(at) = criterion.created_at {
            println!("  added:    {}", at.format("%Y-%m-%d"));
        }
    }
    Ok(())
}

pub async fn remove(prefix: &str) -> anyhow::Result<()> {
    let store = ConfigStore::open(Paths::new())?;
    let matching: Vec<String> = store
        .lookout()
        .criteria
        .iter()
        .map(|c| c.id.clone())
        .filter(|id| id.starts_with(prefix))
        .collect();

    match matching.len() {
        0 => anyhow::bail!("No criterion matches: {}", prefix),
        1 => {
            store.remove_criterion(&matching[0])?;
            println!("✓ Removed {}", matching[0]);
            Ok(())
        }
        n => anyhow::bail!(
            "Prefix {} is ambiguous ({} criteria match). Provide more characters.",
            prefix,
            n
        ),
    }
}

pub async fn scan(target: &str) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(&Paths::new())?;
    if config.look_out_config.criteria.is_empty() {
        println!("No criteria to match. Add one with `pagelens lookout add`.");
        return Ok(());
    }
    // Explicit invocation scans even when background watching is off.
    config.look_out_config.enabled = true;

    let dom: Arc<pagelens_dom::StaticDom> = Arc::new(page::load_document(target).await?);
    let guard = provider::build_guard(&config).await;
    let mut scanner = LookOutScanner::new(dom.clone(), &config, guard);
    scanner.scan().await;

    let url = dom.base_url().to_string();
    if scanner.matches().is_empty() {
        println!("No matches on {}", url);
        return Ok(());
    }

    println!(
        "{} match{} on {}",
        scanner.matches().len(),
        if scanner.matches().len() == 1 { "" } else { "es" },
        url
    );
    println!();
    for found in scanner.matches() {
        let Classification::LookOutMatch {
            criteria_id,
            relevance,
            method,
            explanation,
        } = &found.classification
        else {
            continue;
        };
        let method = match method {
            MatchMethod::Basic => "keywords",
            MatchMethod::Ai => "ai",
        };
        println!(
            "  {:>3}/100 via {:<8} {}  {}",
            relevance,
            method,
            criteria_id,
            snippet(&dom.text(found.node), 70)
        );
        if let Some(explanation) = explanation {
            println!("          {}", explanation);
        }
    }
    Ok(())
}

pub async fn enable(enabled: bool) -> anyhow::Result<()> {
    let store = ConfigStore::open(Paths::new())?;
    store.set_lookout_enabled(enabled)?;
    println!(
        "✓ Look Out {}",
        if enabled { "enabled" } else { "disabled" }
    );
    if enabled && store.lookout().criteria.is_empty() {
        println!("  No criteria yet. Add one with `pagelens lookout add`.");
    }
    Ok(())
}

fn snippet(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        collapsed
    } else {
        let cut: String = collapsed.chars().take(max).collect();
        format!("{}…", cut.trim_end())
    }
}
