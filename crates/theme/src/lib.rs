pub mod luminance;
pub mod palette;

pub use luminance::{relative_luminance, sample_variant, variant_for_luminance, BackgroundSampler};
pub use palette::{colors, effective_variant, DEFAULT_THEME};
