use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;
use crate::types::Category;

/// Detection toggles and appearance selection. Persisted under the
/// `settings` key of the config document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub show_indicators: bool,
    #[serde(default = "default_true")]
    pub detect_ads: bool,
    #[serde(default = "default_true")]
    pub detect_links: bool,
    #[serde(default = "default_true")]
    pub detect_forms: bool,
    #[serde(default = "default_true")]
    pub detect_hidden: bool,
    #[serde(default)]
    pub ai_enabled: bool,
    #[serde(default)]
    pub look_out_enabled: bool,
    #[serde(default)]
    pub theme: ThemeSettings,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            show_indicators: true,
            detect_ads: true,
            detect_links: true,
            detect_forms: true,
            detect_hidden: true,
            ai_enabled: false,
            look_out_enabled: false,
            theme: ThemeSettings::default(),
        }
    }
}

/// Indicator variant selection: fixed light/dark, or derived from the
/// sampled page background when set to `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    #[serde(default = "default_theme_mode")]
    pub mode: ThemeMode,
    #[serde(default = "default_theme_name")]
    pub name: String,
    /// User-defined themes, resolved through the same lookup as the
    /// built-ins and allowed to shadow them by name.
    #[serde(default)]
    pub custom: HashMap<String, ThemeDefinition>,
}

fn default_theme_mode() -> ThemeMode {
    ThemeMode::Auto
}

fn default_theme_name() -> String {
    "classic".to_string()
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            mode: default_theme_mode(),
            name: default_theme_name(),
            custom: HashMap::new(),
        }
    }
}

/// One variant's category colors. Missing categories fall back to the
/// default theme at resolution time, so partial definitions are valid.
pub type VariantColors = HashMap<Category, ColorTriple>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDefinition {
    #[serde(default)]
    pub light: VariantColors,
    #[serde(default)]
    pub dark: VariantColors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorTriple {
    pub background: String,
    pub text: String,
    pub border: String,
}

/// Timing windows, rate budgets, and score thresholds. Every value the
/// engine treats as policy rather than behavior lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tuning {
    /// Delay between a tooltip show request and the reveal measurement.
    #[serde(default = "default_tooltip_reveal_ms")]
    pub tooltip_reveal_ms: u64,
    /// Delay between a hide request and the tooltip actually hiding.
    #[serde(default = "default_tooltip_hide_ms")]
    pub tooltip_hide_ms: u64,
    /// Enter-transition micro delay between positioning and visible.
    #[serde(default = "default_tooltip_enter_ms")]
    pub tooltip_enter_ms: u64,
    /// A visible tooltip hides itself after this long.
    #[serde(default = "default_tooltip_auto_hide_ms")]
    pub tooltip_auto_hide_ms: u64,
    /// Trailing-edge window coalescing document-change bursts into one scan.
    #[serde(default = "default_scan_debounce_ms")]
    pub scan_debounce_ms: u64,
    /// Look Out waits this long after activation before its first scan.
    #[serde(default = "default_lookout_initial_delay_ms")]
    pub lookout_initial_delay_ms: u64,
    /// Look Out's own, slower change-coalescing window.
    #[serde(default = "default_lookout_debounce_ms")]
    pub lookout_debounce_ms: u64,
    /// Minimum relevance (0..=100) for a Look Out match to be kept.
    #[serde(default = "default_lookout_threshold")]
    pub lookout_threshold: u8,
    /// Model calls allowed within any sliding 60s window.
    #[serde(default = "default_model_calls_per_minute")]
    pub model_calls_per_minute: u32,
    #[serde(default = "default_model_cache_capacity")]
    pub model_cache_capacity: usize,
    #[serde(default = "default_model_cache_ttl_ms")]
    pub model_cache_ttl_ms: u64,
}

fn default_tooltip_reveal_ms() -> u64 {
    150
}

fn default_tooltip_hide_ms() -> u64 {
    100
}

fn default_tooltip_enter_ms() -> u64 {
    10
}

fn default_tooltip_auto_hide_ms() -> u64 {
    10_000
}

fn default_scan_debounce_ms() -> u64 {
    300
}

fn default_lookout_initial_delay_ms() -> u64 {
    2_000
}

fn default_lookout_debounce_ms() -> u64 {
    1_000
}

fn default_lookout_threshold() -> u8 {
    70
}

fn default_model_calls_per_minute() -> u32 {
    60
}

fn default_model_cache_capacity() -> usize {
    100
}

fn default_model_cache_ttl_ms() -> u64 {
    3_600_000
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tooltip_reveal_ms: default_tooltip_reveal_ms(),
            tooltip_hide_ms: default_tooltip_hide_ms(),
            tooltip_enter_ms: default_tooltip_enter_ms(),
            tooltip_auto_hide_ms: default_tooltip_auto_hide_ms(),
            scan_debounce_ms: default_scan_debounce_ms(),
            lookout_initial_delay_ms: default_lookout_initial_delay_ms(),
            lookout_debounce_ms: default_lookout_debounce_ms(),
            lookout_threshold: default_lookout_threshold(),
            model_calls_per_minute: default_model_calls_per_minute(),
            model_cache_capacity: default_model_cache_capacity(),
            model_cache_ttl_ms: default_model_cache_ttl_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CriterionKind {
    Job,
    Product,
    Content,
}

/// A user watch criterion. All keywords must be present, any exclude
/// keyword disqualifies, numeric constraints apply per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: String,
    pub kind: CriterionKind,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookOutConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

/// The whole persisted config document (`~/.pagelens/config.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub look_out_config: LookOutConfig,
    #[serde(default)]
    pub tuning: Tuning,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let raw = r#"{
  "settings": { "aiEnabled": true, "detectAds": false },
  "lookOutConfig": { "enabled": true }
}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert!(cfg.settings.ai_enabled);
        assert!(!cfg.settings.detect_ads);
        assert!(cfg.settings.detect_links);
        assert!(cfg.settings.show_indicators);
        assert!(cfg.look_out_config.enabled);
        assert!(cfg.look_out_config.criteria.is_empty());
        assert_eq!(cfg.tuning.lookout_threshold, 70);
    }

    #[test]
    fn test_camel_case_round_trip() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"showIndicators\":true"));
        assert!(json.contains("\"lookOutConfig\""));
        assert!(json.contains("\"scanDebounceMs\":300"));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tuning.model_calls_per_minute, 60);
        assert_eq!(back.settings.theme.name, "classic");
    }

    #[test]
    fn test_criterion_parses_constraints() {
        let raw = r#"{
  "id": "c-1",
  "kind": "job",
  "keywords": ["rust", "remote"],
  "excludeKeywords": ["intern"],
  "salaryMin": 90000
}"#;
        let c: Criterion = serde_json::from_str(raw).unwrap();
        assert_eq!(c.kind, CriterionKind::Job);
        assert_eq!(c.salary_min, Some(90000.0));
        assert!(c.price_max.is_none());
        assert_eq!(c.exclude_keywords, vec!["intern".to_string()]);
    }
}
