//! Error types for dataset ingestion

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Fatal dataset failure: nothing can be rendered without the table.
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("dataset not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("dataset unreadable: {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("dataset {} is missing required columns: {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },
}

impl DataSourceError {
    /// Path of the dataset that failed to load
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound { path }
            | Self::Unreadable { path, .. }
            | Self::Parse { path, .. }
            | Self::MissingColumns { path, .. } => path,
        }
    }
}
