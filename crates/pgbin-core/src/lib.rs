pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub mod cache;
pub mod catalog;
pub mod checksum;
pub mod hooks;
pub mod http;
pub mod install;
pub mod target;

pub use error::{ErrorKind, PgBinError, Result};
pub use hooks::{exec_env, install, list_versions, HostContext, ListVersionsOutput};
