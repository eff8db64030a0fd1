use std::time::{Duration, Instant};

use pagelens_core::Variant;
use pagelens_dom::{DomHost, Rgba};

/// Normalized sample coordinates: center plus four corners inset 10%.
const SAMPLE_POINTS: &[(f64, f64)] = &[
    (0.5, 0.5),
    (0.1, 0.1),
    (0.9, 0.1),
    (0.1, 0.9),
    (0.9, 0.9),
];

const CACHE_WINDOW: Duration = Duration::from_secs(1);

/// WCAG relative luminance with sRGB channel linearization.
pub fn relative_luminance(color: &Rgba) -> f64 {
    fn linearize(channel: u8) -> f64 {
        let c = channel as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * linearize(color.r) + 0.7152 * linearize(color.g) + 0.0722 * linearize(color.b)
}

/// The boundary is non-strict: a mean of exactly 0.5 reads as light.
pub fn variant_for_luminance(mean: f64) -> Variant {
    if mean >= 0.5 {
        Variant::Light
    } else {
        Variant::Dark
    }
}

/// Samples the page background at the fixed points and averages the
/// luminance of whichever points yielded a color. Unsampleable points
/// are skipped; a page with no sampleable background reads as light.
pub fn sample_variant(host: &dyn DomHost) -> Variant {
    let viewport = host.viewport();
    let (w, h) = (viewport.width as f64, viewport.height as f64);

    let mut total = 0.0;
    let mut sampled = 0usize;
    for &(nx, ny) in SAMPLE_POINTS {
        if let Some(color) = host.background_at(nx * w, ny * h) {
            total += relative_luminance(&color);
            sampled += 1;
        }
    }

    if sampled == 0 {
        return Variant::Light;
    }
    variant_for_luminance(total / sampled as f64)
}

/// Caches the sampled variant for one second of wall-clock time, which
/// bounds recomputation during rapid indicator refreshes. Single-owner;
/// the overlay engine holds it mutably.
#[derive(Debug, Default)]
pub struct BackgroundSampler {
    cached: Option<(Instant, Variant)>,
}

impl BackgroundSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variant(&mut self, host: &dyn DomHost) -> Variant {
        self.variant_at(host, Instant::now())
    }

    fn variant_at(&mut self, host: &dyn DomHost, now: Instant) -> Variant {
        if let Some((at, variant)) = self.cached {
            if now.duration_since(at) < CACHE_WINDOW {
                return variant;
            }
        }
        let variant = sample_variant(host);
        self.cached = Some((now, variant));
        variant
    }
}
