pub mod engine;
pub mod indicator;
pub mod scan;
pub mod tooltip;

pub use engine::{EngineEvent, OverlayEngine, OverlayUpdate};
pub use indicator::{IndicatorRecord, IndicatorSet};
pub use scan::{classify_page, ScanEntry};
pub use tooltip::{estimate_size, place, Placement, TooltipController, TooltipFire};
