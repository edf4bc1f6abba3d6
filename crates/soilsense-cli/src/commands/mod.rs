//! Command implementations for the CLI.

mod classify;
mod config;
mod decode;
mod read;
mod recommend;
mod rules;

pub use classify::cmd_classify;
pub use config::cmd_config;
pub use decode::cmd_decode;
pub use read::{acquire, cmd_read};
pub use recommend::{RecommendArgs, cmd_recommend};
pub use rules::{RulesArgs, cmd_rules};
