pub mod store;
pub mod watch;

pub use store::{ConfigEvent, ConfigStore};
pub use watch::{watch, ConfigWatcher};
