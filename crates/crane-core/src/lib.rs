#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod link;
pub mod version;

pub use config::{InstallMode, LocalProject, RepoConfig, REPO_CONFIG_FILENAME};
pub use error::Error;
pub use version::VERSION;
