//! CLI command handlers, one per file.

mod checksum;
mod completions;
mod env;
mod install;
mod list_versions;
mod recommend;
mod target;

pub use checksum::run_checksum;
pub use completions::run_completions;
pub use env::run_env;
pub use install::run_install;
pub use list_versions::run_list_versions;
pub use recommend::run_recommend;
pub use target::run_target;
