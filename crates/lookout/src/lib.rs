pub mod matcher;
pub mod scanner;

pub use matcher::{ai_match, analyze, basic_match, MatchResult};
pub use scanner::{candidate_selector, LookOutScanner, PageMatch, ScanSignal};
