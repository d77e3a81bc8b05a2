//! Worker lifecycle MCP tools.

pub mod activate;
pub mod fetch;
pub mod install;
pub mod message;
pub mod status;

pub use activate::{SwActivateParams, activate_impl};
pub use fetch::{SwFetchParams, fetch_impl};
pub use install::{SwInstallParams, install_impl};
pub use message::{SwMessageParams, message_impl};
pub use status::{SwStatusParams, status_impl};
