//! End-to-end request flow.
//!
//! ```text
//! Received -> SpecResolving -> NeedsManualInput*
//!                           -> SpecReady -> EdgeExtracting -> InternalError*
//!                                                         -> EdgeReady -> DistanceComputing -> Success*
//!                                                                                           -> ComputationFailed*
//!                                                                                           -> EnvironmentIncompatible*
//!                                                                                           -> InternalError*
//! ```
//!
//! This is the only place internal conditions become terminal statuses.
//! Process stderr is logged, never copied into the diagnostic message.

use crate::devices::{load_device_file, DeviceDbError, DeviceSpecDatabase};
use crate::domain::models::{
    CameraSpecification, EdgeExtraction, PipelineRequest, PipelineResult, PipelineStatus,
};
use crate::services::config::Config;
use crate::services::enrichment::fetch_external_specs;
use crate::services::invoker::{invoke, InvokeError, ProcessInvocation};
use crate::services::metadata::{ExifMetadataExtractor, MetadataExtractor};
use crate::services::output_parser::{parse_distance, parse_json_payload, Classifier, FailureKind};
use crate::services::resolver::SpecResolver;
use crate::services::staging::stage_image;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    SpecResolving,
    SpecReady,
    EdgeExtracting,
    EdgeReady,
    DistanceComputing,
}

struct EdgeOutput {
    points_file: PathBuf,
    points_count: u64,
    width: Option<u32>,
    height: Option<u32>,
}

pub struct Pipeline {
    config: Config,
    devices: Arc<DeviceSpecDatabase>,
    metadata: Arc<dyn MetadataExtractor>,
}

fn enter(stage: Stage, image: &std::path::Path) {
    tracing::info!(stage = ?stage, image = %image.display(), "pipeline stage");
}

fn internal(spec: &CameraSpecification, message: &str) -> PipelineResult {
    PipelineResult::failure(PipelineStatus::InternalError, spec.clone(), message)
}

impl Pipeline {
    pub fn new(
        config: Config,
        devices: Arc<DeviceSpecDatabase>,
        metadata: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            config,
            devices,
            metadata,
        }
    }

    /// Built-in device table extended by the configured devices file, EXIF
    /// metadata reader.
    pub fn from_config(config: Config) -> Result<Self, DeviceDbError> {
        let devices = build_device_database(&config)?;
        Ok(Self::new(
            config,
            Arc::new(devices),
            Arc::new(ExifMetadataExtractor),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn devices(&self) -> &DeviceSpecDatabase {
        &self.devices
    }

    /// Gathers every source for the request's image and merges them.
    pub async fn resolve_spec(&self, request: &PipelineRequest) -> CameraSpecification {
        enter(Stage::SpecResolving, &request.image_path);
        let extractor = Arc::clone(&self.metadata);
        let path = request.image_path.clone();
        let metadata = tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("metadata extraction aborted: {e}");
                None
            });
        let external = fetch_external_specs(&self.config.enrichment, &request.image_path).await;

        SpecResolver::new(&self.devices).resolve(request, external.as_ref(), metadata.as_ref())
    }

    pub async fn run(&self, request: &PipelineRequest) -> PipelineResult {
        enter(Stage::Received, &request.image_path);
        let spec = self.resolve_spec(request).await;

        let (Some(focal_length_mm), Some(pixel_pitch_um)) =
            (spec.focal_length_mm, spec.pixel_pitch_um)
        else {
            return needs_manual_input(spec);
        };
        if !spec.is_computation_ready() {
            return needs_manual_input(spec);
        }
        enter(Stage::SpecReady, &request.image_path);

        let staged = match stage_image(&self.config.staging_root(), &request.image_path).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(image = %request.image_path.display(), "staging failed: {e}");
                return internal(&spec, "The uploaded image could not be prepared for processing.");
            }
        };

        enter(Stage::EdgeExtracting, &staged.image);
        let edge = match self.extract_edges(&staged.image).await {
            Ok(edge) => edge,
            Err(message) => return internal(&spec, message),
        };
        enter(Stage::EdgeReady, &staged.image);

        let (Some(width), Some(height)) = (
            edge.width.or(spec.image_width_px),
            edge.height.or(spec.image_height_px),
        ) else {
            return internal(&spec, "Image dimensions could not be determined.")
                .with_edge_points(edge.points_count);
        };

        enter(Stage::DistanceComputing, &staged.image);
        let d = &self.config.distance;
        let inv = ProcessInvocation::new(&d.binary, d.timeout_ms)
            .arg("distance")
            .arg("--camera-focal-length")
            .arg((focal_length_mm * 1e-3).to_string())
            .arg("--camera-pixel-size")
            .arg((pixel_pitch_um * 1e-6).to_string())
            .arg("--reference-orientation")
            .arg(d.reference_orientation.as_str())
            .arg("--image-width")
            .arg(width.to_string())
            .arg("--image-height")
            .arg(height.to_string())
            .arg("--edge-points")
            .arg(edge.points_file.to_string_lossy())
            .arg("--planetary-radius")
            .arg(request.planetary_radius_m.to_string());

        let out = match invoke(&inv).await {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!("distance stage: {e}");
                let message = match e {
                    InvokeError::Timeout { .. } => "Distance computation timed out.",
                    InvokeError::Spawn { .. } => "The distance computer could not be started.",
                };
                return internal(&spec, message).with_edge_points(edge.points_count);
            }
        };

        let classifier = Classifier {
            not_located_markers: &d.not_located_markers,
        };
        let result = match classifier.classify_failure(&out.stdout, &out.stderr, out.exit_code) {
            None => match parse_distance(&out.stdout) {
                Some(distance) => {
                    tracing::info!(distance_m = distance, "distance computed");
                    PipelineResult::success(distance, edge.points_count, spec)
                }
                None => internal(&spec, "The distance computer returned no distance."),
            },
            Some(FailureKind::EnvironmentIncompatible { marker }) => {
                tracing::warn!(
                    marker = %marker,
                    stderr = %out.stderr,
                    "distance binary incompatible with host"
                );
                PipelineResult::failure(
                    PipelineStatus::EnvironmentIncompatible,
                    spec,
                    format!(
                        "The distance computer cannot run on this server: the host runtime libraries are older than it requires ({marker})."
                    ),
                )
            }
            Some(FailureKind::ComputationFailed) => PipelineResult::failure(
                PipelineStatus::ComputationFailed,
                spec,
                "The planet could not be located in this image. Try a photo with a clearly visible horizon.",
            ),
            Some(FailureKind::InternalError { reason, stderr }) => {
                tracing::warn!(reason = %reason, stderr = %stderr, "distance stage failed");
                internal(
                    &spec,
                    &format!("Distance computation failed unexpectedly ({reason})."),
                )
            }
        };
        result.with_edge_points(edge.points_count)
    }

    async fn extract_edges(&self, image: &std::path::Path) -> Result<EdgeOutput, &'static str> {
        let e = &self.config.edge;
        let inv = ProcessInvocation::new(&e.command, e.timeout_ms)
            .args(e.args.iter().cloned())
            .arg(image.to_string_lossy());

        let out = invoke(&inv).await.map_err(|err| {
            tracing::warn!("edge stage: {err}");
            match err {
                InvokeError::Timeout { .. } => "Edge extraction timed out.",
                InvokeError::Spawn { .. } => "The edge extractor could not be started.",
            }
        })?;

        let Some(parsed) = parse_json_payload::<EdgeExtraction>(&out.stdout) else {
            tracing::warn!(
                exit_code = ?out.exit_code,
                stderr = %out.stderr,
                "edge stage printed no result"
            );
            return Err("Edge extraction returned an unreadable result.");
        };
        if !out.succeeded() || !parsed.success {
            tracing::warn!(
                exit_code = ?out.exit_code,
                error = parsed.error.as_deref().unwrap_or(""),
                stderr = %out.stderr,
                "edge stage failed"
            );
            return Err("Edge extraction failed.");
        }
        let Some(points_file) = parsed.edge_points_file else {
            return Err("Edge extraction did not report an edge-points file.");
        };
        tracing::info!(
            points = parsed.edge_points_count,
            file = %points_file.display(),
            "edges extracted"
        );
        Ok(EdgeOutput {
            points_file,
            points_count: parsed.edge_points_count,
            width: parsed.width.filter(|w| *w > 0),
            height: parsed.height.filter(|h| *h > 0),
        })
    }
}

fn needs_manual_input(spec: CameraSpecification) -> PipelineResult {
    let missing = spec.missing_fields().join(" and ");
    tracing::info!(missing = %missing, "specification incomplete");
    PipelineResult::failure(
        PipelineStatus::NeedsManualInput,
        spec,
        format!(
            "The camera {missing} could not be determined from this photo. Enter them manually (focal length in mm, pixel pitch in µm) and resubmit."
        ),
    )
}

pub fn build_device_database(config: &Config) -> Result<DeviceSpecDatabase, DeviceDbError> {
    let db = DeviceSpecDatabase::builtin();
    match &config.pipeline.devices_file {
        Some(path) => db.extend(load_device_file(path)?),
        None => Ok(db),
    }
}
