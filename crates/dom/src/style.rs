use serde::{Deserialize, Serialize};

/// A resolved color with alpha. Components are 0..=255, alpha 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0.0
    }
}

/// Parses the color syntaxes that matter for background sampling:
/// `#rgb`, `#rrggbb`, `rgb()`, `rgba()` and a handful of keywords.
pub fn parse_css_color(value: &str) -> Option<Rgba> {
    let v = value.trim().to_lowercase();

    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }

    if let Some(body) = v
        .strip_prefix("rgba(")
        .or_else(|| v.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let r = parts[0].parse::<f64>().ok()?;
        let g = parts[1].parse::<f64>().ok()?;
        let b = parts[2].parse::<f64>().ok()?;
        let a = if parts.len() > 3 {
            parts[3].parse::<f64>().ok()?
        } else {
            1.0
        };
        return Some(Rgba {
            r: clamp_u8(r),
            g: clamp_u8(g),
            b: clamp_u8(b),
            a: a.clamp(0.0, 1.0),
        });
    }

    match v.as_str() {
        "white" => Some(Rgba::rgb(255, 255, 255)),
        "black" => Some(Rgba::rgb(0, 0, 0)),
        "red" => Some(Rgba::rgb(255, 0, 0)),
        "green" => Some(Rgba::rgb(0, 128, 0)),
        "blue" => Some(Rgba::rgb(0, 0, 255)),
        "gray" | "grey" => Some(Rgba::rgb(128, 128, 128)),
        "transparent" => Some(Rgba {
            r: 0,
            g: 0,
            b: 0,
            a: 0.0,
        }),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
            Some(Rgba::rgb(r * 17, g * 17, b * 17))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgba::rgb(r, g, b))
        }
        _ => None,
    }
}

fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// The computed-style slice the classifiers consume. Values follow CSS
/// computed-value conventions (lowercase keywords, opacity 0..=1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
    pub position: String,
    pub background_color: Option<Rgba>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
            position: "static".to_string(),
            background_color: None,
        }
    }
}

impl ComputedStyle {
    pub fn is_out_of_flow(&self) -> bool {
        self.position == "fixed" || self.position == "absolute"
    }
}

/// Splits an inline `style` attribute into (property, value) pairs.
/// Tolerates empty declarations and stray semicolons.
pub fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_lowercase();
            let value = value.trim().to_string();
            if prop.is_empty() || value.is_empty() {
                None
            } else {
                Some((prop, value))
            }
        })
        .collect()
}

/// Parses a CSS length as pixels: bare numbers, `px`, or `%` of `base`.
pub fn parse_length(value: &str, base: f64) -> Option<f64> {
    let v = value.trim();
    if let Some(pct) = v.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|p| base * p / 100.0);
    }
    let v = v.strip_suffix("px").unwrap_or(v);
    v.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(parse_css_color("#fff"), Some(Rgba::rgb(255, 255, 255)));
        assert_eq!(parse_css_color("#000000"), Some(Rgba::rgb(0, 0, 0)));
        assert_eq!(parse_css_color("#1a2b3c"), Some(Rgba::rgb(26, 43, 60)));
        assert_eq!(parse_css_color("#12345"), None);
    }

    #[test]
    fn test_parse_rgb_functions() {
        assert_eq!(
            parse_css_color("rgb(255, 128, 0)"),
            Some(Rgba::rgb(255, 128, 0))
        );
        let semi = parse_css_color("rgba(10, 20, 30, 0.5)").unwrap();
        assert_eq!((semi.r, semi.g, semi.b), (10, 20, 30));
        assert!((semi.a - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_css_color("White"), Some(Rgba::rgb(255, 255, 255)));
        assert!(parse_css_color("transparent").unwrap().is_transparent());
        assert_eq!(parse_css_color("papayawhip"), None);
    }

    #[test]
    fn test_parse_inline_style() {
        let decls = parse_inline_style("display:none; opacity: 0.5;; color:");
        assert_eq!(
            decls,
            vec![
                ("display".to_string(), "none".to_string()),
                ("opacity".to_string(), "0.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("120px", 0.0), Some(120.0));
        assert_eq!(parse_length("80", 0.0), Some(80.0));
        assert_eq!(parse_length("50%", 1000.0), Some(500.0));
        assert_eq!(parse_length("auto", 0.0), None);
    }
}
