use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use pagelens_core::config::VariantColors;
use pagelens_core::{Category, ColorTriple, ThemeDefinition, ThemeMode, ThemeSettings, Variant};

pub const DEFAULT_THEME: &str = "classic";

static BUILT_IN: Lazy<HashMap<&'static str, ThemeDefinition>> = Lazy::new(|| {
    let mut themes = HashMap::new();
    themes.insert("classic", classic());
    themes.insert("contrast", contrast());
    themes
});

fn triple(background: &str, text: &str, border: &str) -> ColorTriple {
    ColorTriple {
        background: background.to_string(),
        text: text.to_string(),
        border: border.to_string(),
    }
}

fn classic() -> ThemeDefinition {
    let mut light: VariantColors = HashMap::new();
    light.insert(Category::Ad, triple("#fef2f2", "#b91c1c", "#ef4444"));
    light.insert(Category::LinkInternal, triple("#eff6ff", "#1d4ed8", "#3b82f6"));
    light.insert(Category::LinkExternal, triple("#fff7ed", "#c2410c", "#f97316"));
    light.insert(Category::Form, triple("#f0fdfa", "#0f766e", "#14b8a6"));
    light.insert(Category::Hidden, triple("#fefce8", "#a16207", "#fbbf24"));
    light.insert(Category::LookOut, triple("#ecfdf5", "#047857", "#10b981"));

    let mut dark: VariantColors = HashMap::new();
    dark.insert(Category::Ad, triple("#450a0a", "#fca5a5", "#ef4444"));
    dark.insert(Category::LinkInternal, triple("#172554", "#93c5fd", "#3b82f6"));
    dark.insert(Category::LinkExternal, triple("#431407", "#fdba74", "#f97316"));
    dark.insert(Category::Form, triple("#042f2e", "#5eead4", "#14b8a6"));
    dark.insert(Category::Hidden, triple("#422006", "#fde047", "#fbbf24"));
    dark.insert(Category::LookOut, triple("#022c22", "#6ee7b7", "#10b981"));

    ThemeDefinition { light, dark }
}

fn contrast() -> ThemeDefinition {
    let borders = [
        (Category::Ad, "#dc2626"),
        (Category::LinkInternal, "#2563eb"),
        (Category::LinkExternal, "#ea580c"),
        (Category::Form, "#0f766e"),
        (Category::Hidden, "#ca8a04"),
        (Category::LookOut, "#059669"),
    ];

    let mut light: VariantColors = HashMap::new();
    let mut dark: VariantColors = HashMap::new();
    for (category, border) in borders {
        light.insert(category, triple("#ffffff", "#000000", border));
        dark.insert(category, triple("#000000", "#ffffff", border));
    }

    ThemeDefinition { light, dark }
}

/// The variant indicators actually render with: a fixed mode wins, auto
/// follows the sampled page background.
pub fn effective_variant(mode: ThemeMode, sampled: Variant) -> Variant {
    match mode {
        ThemeMode::Light => Variant::Light,
        ThemeMode::Dark => Variant::Dark,
        ThemeMode::Auto => sampled,
    }
}

/// Resolves the active theme to a color triple for one category. User
/// themes shadow built-ins by name; a missing theme, variant table or
/// category entry falls back to the default built-in theme's entry.
pub fn colors(settings: &ThemeSettings, category: Category, variant: Variant) -> ColorTriple {
    let definition = settings
        .custom
        .get(&settings.name)
        .or_else(|| BUILT_IN.get(settings.name.as_str()));

    if let Some(found) = definition.and_then(|d| entry(d, variant, category)) {
        return found;
    }

    debug!(theme = %settings.name, %category, "Theme entry missing, using default theme");
    BUILT_IN
        .get(DEFAULT_THEME)
        .and_then(|d| entry(d, variant, category))
        .unwrap_or_else(|| triple("#f3f4f6", "#111827", "#6b7280"))
}

fn entry(definition: &ThemeDefinition, variant: Variant, category: Category) -> Option<ColorTriple> {
    let table = match variant {
        Variant::Light => &definition.light,
        Variant::Dark => &definition.dark,
    };
    table.get(&category).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_covers_every_category_and_variant() {
        for category in [
            Category::Ad,
            Category::LinkInternal,
            Category::LinkExternal,
            Category::Form,
            Category::Hidden,
            Category::LookOut,
        ] {
            for variant in [Variant::Light, Variant::Dark] {
                let c = colors(&ThemeSettings::default(), category, variant);
                assert!(c.background.starts_with('#'));
                assert!(c.border.starts_with('#'));
            }
        }
    }

    #[test]
    fn test_unknown_theme_falls_back_to_default() {
        let settings = ThemeSettings {
            name: "no-such-theme".into(),
            ..ThemeSettings::default()
        };
        let fallback = colors(&settings, Category::Ad, Variant::Light);
        let classic = colors(&ThemeSettings::default(), Category::Ad, Variant::Light);
        assert_eq!(fallback, classic);
    }

    #[test]
    fn test_custom_theme_shadows_built_in() {
        let mut custom = ThemeDefinition::default();
        custom
            .light
            .insert(Category::Ad, triple("#111111", "#eeeeee", "#ff0000"));
        let mut settings = ThemeSettings::default();
        settings.custom.insert("classic".into(), custom);

        let c = colors(&settings, Category::Ad, Variant::Light);
        assert_eq!(c.border, "#ff0000");
        // Categories the custom theme leaves out resolve via the default
        // built-in definition.
        let form = colors(&settings, Category::Form, Variant::Light);
        assert_eq!(form.border, "#14b8a6");
    }

    #[test]
    fn test_mode_overrides_sampled_variant() {
        assert_eq!(effective_variant(ThemeMode::Dark, Variant::Light), Variant::Dark);
        assert_eq!(effective_variant(ThemeMode::Light, Variant::Dark), Variant::Light);
        assert_eq!(effective_variant(ThemeMode::Auto, Variant::Dark), Variant::Dark);
    }
}
