pub mod config;
pub mod paths;

pub use config::{Config, ConfigOverrides, FeedKind, ImdbConfig, PacingMode, SyncConfig, TitleTypes, TraktConfig};
pub use paths::PathManager;
