//! SQLite persistence for mood readings and learned patterns, plus data
//! directory and config file handling.

pub mod config;
pub mod error;
pub mod schema;
pub mod store;

pub use config::{load_config, parse_config, prepare_data_dir, resolve_base_dir};
pub use error::{Result, StoreError};
pub use store::{Store, StoredReading};
