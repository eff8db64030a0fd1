pub mod config_cmd;
pub mod doctor;
pub mod inspect;
pub mod lookout_cmd;
pub mod page;
pub mod provider;
pub mod scan;
pub mod watch_cmd;
