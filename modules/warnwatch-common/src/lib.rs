pub mod config;
pub mod error;
pub mod types;

pub use config::{EmailConfig, NotifyConfig, SmtpSettings, SourceConfig, WatchConfig, WatchSection};
pub use error::{WatchError, WatchResult};
pub use types::*;
