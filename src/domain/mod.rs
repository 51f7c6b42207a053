//! Shared data model layer (structs/constants only).
//!
//! ## Files
//! - `models.rs`: camera specification, request/result, collaborator payloads.
//! - `constants.rs`: defaults, markers and unit factors.
//!
//! ## Rule of thumb
//! Domain types are data-only: no filesystem or process side effects.
//!
//! ## Compatibility note
//! `PipelineResult` and `CameraSpecification` are the `--json` output of
//! `measure`/`resolve`. Keep `docs/contracts/*` in sync with schema changes.

pub mod constants;
pub mod models;
