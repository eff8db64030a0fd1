use std::io::Read;
use std::path::Path;

use url::Url;

use pagelens_dom::StaticDom;

/// Load a document from a file path, an http(s) URL, or stdin (`-`).
pub async fn load_document(target: &str) -> anyhow::Result<StaticDom> {
    if target == "-" {
        let mut html = String::new();
        std::io::stdin().read_to_string(&mut html)?;
        return Ok(StaticDom::parse(&html, "file:///stdin")?);
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        let response = reqwest::get(target)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to fetch {}: {}", target, e))?;
        if !response.status().is_success() {
            anyhow::bail!("Fetch of {} returned {}", target, response.status());
        }
        let html = response.text().await?;
        return Ok(StaticDom::parse(&html, target)?);
    }

    let path = Path::new(target);
    if !path.exists() {
        anyhow::bail!("File not found: {}", target);
    }
    let html = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", target, e))?;

    // Canonicalize so relative hrefs in the page resolve against a real base.
    let base = path
        .canonicalize()
        .ok()
        .and_then(|p| Url::from_file_path(p).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| format!("file:///{}", target.trim_start_matches('/')));

    Ok(StaticDom::parse(&html, &base)?)
}

/// Short element descriptor in devtools notation: tag#id.class1.class2.
pub fn describe(host: &dyn pagelens_dom::DomHost, id: pagelens_dom::NodeId) -> String {
    let mut out = host.tag(id).unwrap_or_else(|| "?".into());
    if let Some(elem_id) = host.attr(id, "id") {
        if !elem_id.is_empty() {
            out.push('#');
            out.push_str(&elem_id);
        }
    }
    if let Some(classes) = host.attr(id, "class") {
        for class in classes.split_whitespace().take(2) {
            out.push('.');
            out.push_str(class);
        }
    }
    out
}
