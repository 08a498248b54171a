pub mod cli;
pub mod config;
pub mod error;
pub mod k8s;
pub mod kv;
pub mod metrics;
pub mod reconcile;
pub mod server;
pub mod session;

pub use config::Config;
pub use error::{LocatorError, Result};
pub use worker_locator_common::{Session, WorkerInfo};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
