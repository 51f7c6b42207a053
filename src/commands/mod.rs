//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `runtime.rs`: measure/resolve, the commands that read an image.
//! - `admin.rs`: devices/focal/doctor.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.

pub mod admin;
pub mod runtime;

pub use admin::{handle_device_commands, handle_doctor, handle_focal};
pub use runtime::{handle_measure, handle_resolve};

use crate::services::pipeline::Pipeline;
use std::path::PathBuf;

pub struct Context {
    pub json: bool,
    /// Config file actually read, if any.
    pub config_path: Option<PathBuf>,
    pub pipeline: Pipeline,
}

/// Errors that map to a specific envelope code.
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    /// The pipeline ended in `internal_error`.
    #[error("{0}")]
    Internal(String),
}

impl CommandError {
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::InvalidInput(_) => "INVALID_INPUT",
            CommandError::NotFound(_) => "NOT_FOUND",
            CommandError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x}")).unwrap_or_else(|| "n/a".to_string())
}
