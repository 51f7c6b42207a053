//! Service layer containing the pipeline and its side-effect helpers.
//!
//! ## Service map
//! - `pipeline.rs`: request flow and the mapping to terminal statuses.
//! - `resolver.rs`: layered camera-specification merge.
//! - `metadata.rs`: EXIF reading behind the `MetadataExtractor` seam.
//! - `enrichment.rs`: optional external spec lookup script.
//! - `invoker.rs`: bounded external process runs.
//! - `output_parser.rs`: distance parsing and failure classification.
//! - `staging.rs`: per-request scratch directories.
//! - `config.rs`: TOML configuration.
//! - `doctor.rs`: environment checks.
//! - `output.rs`: JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod config;
pub mod doctor;
pub mod enrichment;
pub mod invoker;
pub mod metadata;
pub mod output;
pub mod output_parser;
pub mod pipeline;
pub mod resolver;
pub mod staging;
