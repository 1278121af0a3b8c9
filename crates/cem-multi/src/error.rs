//! Failures of a multi-year run.
//!
//! None of these are retried: a broken carry-forward link invalidates every
//! later year, so the run stops at the failing year and leaves the
//! artifacts of completed years on disk.

use cem_core::{TechId, ZoneId};
use cem_scenarios::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MultiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("year {year} is not part of the scenario")]
    UnknownYear { year: u32 },

    #[error("building model instance for {year}")]
    Build {
        year: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("cluster pre-solve for {year}")]
    Cluster {
        year: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("solving {year}")]
    Solve {
        year: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("{year}: {variable}[{zone},{tech}] = {value} is negative beyond solver tolerance")]
    Anomaly {
        year: u32,
        variable: &'static str,
        zone: ZoneId,
        tech: TechId,
        value: f64,
    },

    #[error("{action} artifact '{}'", path.display())]
    Artifact {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding artifact '{}'", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("result for {year} missing at '{}'", path.display())]
    MissingResult { year: u32, path: PathBuf },

    #[error("result for {year} is malformed: {message}")]
    MalformedResult { year: u32, message: String },
}

impl MultiError {
    /// Year the failure belongs to, when it is tied to one.
    pub fn year(&self) -> Option<u32> {
        match self {
            MultiError::UnknownYear { year }
            | MultiError::Build { year, .. }
            | MultiError::Cluster { year, .. }
            | MultiError::Solve { year, .. }
            | MultiError::Anomaly { year, .. }
            | MultiError::MissingResult { year, .. }
            | MultiError::MalformedResult { year, .. } => Some(*year),
            _ => None,
        }
    }
}
