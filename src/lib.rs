pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::http::K3CloudClient;
pub use core::{
    engine::{write_output, QueryEngine},
    normalizer::{flatten_unique, normalize, NormalizationPolicy},
    report::{PolicyOverrides, Report},
};
pub use utils::error::{QueryError, Result};
