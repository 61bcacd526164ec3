pub mod aliases;
pub mod config;
pub mod matching;
pub mod profile;
mod util;

pub use aliases::AliasesCmd;
pub use config::ConfigCmd;
pub use matching::{MatchArgs, PassArgs};
pub use profile::{NormalizeArgs, SuggestArgs};
