#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod glob;
pub mod path;
pub mod settings;
pub mod stat;
pub mod transcode;

pub use client::{Backend, BackendConfig};
pub use connection::{with_connection, Connection};
pub use error::{Error, ErrorKind, Result, Side};
pub use path::GenericPath;
pub use settings::Settings;
pub use stat::FileStat;
