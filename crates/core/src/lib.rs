pub mod config;
pub mod debounce;
pub mod error;
pub mod message;
pub mod paths;
pub mod sanitize;
pub mod types;

pub use config::{
    ColorTriple, Config, Criterion, CriterionKind, LookOutConfig, Settings, ThemeDefinition,
    ThemeMode, ThemeSettings, Tuning,
};
pub use debounce::Debouncer;
pub use error::{Error, Result};
pub use message::{ContextMessage, EngineNotice};
pub use paths::Paths;
pub use types::{
    Category, Classification, FormPurpose, HiddenKind, LinkDirection, MatchMethod, TooltipContent,
    TooltipField, Variant,
};
