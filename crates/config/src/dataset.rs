//! Dataset configuration

use std::path::PathBuf;

use serde::Deserialize;

/// Default dataset path
pub const DEFAULT_DATASET_PATH: &str = "data/prod/data.json";

/// Location of the persisted server records
///
/// The file holds a sequence of JSON objects with `Name` and `Datacenter`
/// fields and no enclosing array. It is opened read-only once per call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Path to the dataset file
    /// Default: data/prod/data.json
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATASET_PATH),
        }
    }
}
