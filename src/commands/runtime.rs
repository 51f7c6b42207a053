use super::{fmt_opt, CommandError, Context};
use crate::cli::ManualSpecs;
use crate::domain::models::{CameraSpecification, PipelineRequest, PipelineResult, ResolveReport};
use crate::services::output::print_one;
use std::path::Path;

fn positive(flag: &str, v: Option<f64>) -> Result<Option<f64>, CommandError> {
    match v {
        Some(x) if !(x.is_finite() && x > 0.0) => Err(CommandError::InvalidInput(format!(
            "--{flag} must be a positive number, got {x}"
        ))),
        other => Ok(other),
    }
}

fn build_request(
    image: &Path,
    manual: &ManualSpecs,
    planetary_radius_m: f64,
) -> Result<PipelineRequest, CommandError> {
    if !image.is_file() {
        return Err(CommandError::NotFound(format!(
            "image not found: {}",
            image.display()
        )));
    }
    let mut request = PipelineRequest::new(image);
    request.planetary_radius_m = planetary_radius_m;
    request.manual_focal_length_mm = positive("focal-length-mm", manual.focal_length_mm)?;
    request.manual_pixel_pitch_um = positive("pixel-pitch-um", manual.pixel_pitch_um)?;
    Ok(request)
}

fn spec_lines(spec: &CameraSpecification) -> Vec<String> {
    vec![
        format!(
            "camera: {} {}",
            spec.make.as_deref().unwrap_or("unknown"),
            spec.model.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string(),
        format!("focal_length_mm: {}", fmt_opt(spec.focal_length_mm)),
        format!("pixel_pitch_um: {}", fmt_opt(spec.pixel_pitch_um)),
        format!("focal_length_35mm: {}", fmt_opt(spec.focal_length_35mm)),
        format!("sensor_diagonal_mm: {}", spec.sensor_diagonal_mm),
        format!("sources: {}", spec.source_trail),
    ]
}

fn render_result(r: &PipelineResult) -> String {
    let status = serde_json::to_value(r.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let mut lines = vec![format!("status: {status}")];
    if let Some(d) = r.distance_meters {
        lines.push(format!("distance_m: {d:.0}"));
    }
    if let Some(n) = r.edge_points_count {
        lines.push(format!("edge_points: {n}"));
    }
    lines.extend(spec_lines(&r.camera_specification));
    lines.push(r.diagnostic_message.clone());
    lines.join("\n")
}

pub async fn handle_measure(
    ctx: &Context,
    image: &Path,
    manual: &ManualSpecs,
    planetary_radius_m: Option<f64>,
) -> anyhow::Result<()> {
    let radius = positive("planetary-radius-m", planetary_radius_m)?
        .unwrap_or(ctx.pipeline.config().pipeline.planetary_radius_m);
    let request = build_request(image, manual, radius)?;
    let result = ctx.pipeline.run(&request).await;
    if result.status.is_server_fault() {
        return Err(CommandError::Internal(result.diagnostic_message).into());
    }
    print_one(ctx.json, result, render_result)
}

pub async fn handle_resolve(
    ctx: &Context,
    image: &Path,
    manual: &ManualSpecs,
) -> anyhow::Result<()> {
    let request = build_request(
        image,
        manual,
        ctx.pipeline.config().pipeline.planetary_radius_m,
    )?;
    let spec = ctx.pipeline.resolve_spec(&request).await;
    let report = ResolveReport {
        computation_ready: spec.is_computation_ready(),
        missing: spec.missing_fields(),
        camera_specification: spec,
    };
    print_one(ctx.json, report, |r| {
        let mut lines = spec_lines(&r.camera_specification);
        lines.push(if r.computation_ready {
            "ready: yes".to_string()
        } else {
            format!("ready: no (missing {})", r.missing.join(", "))
        });
        lines.join("\n")
    })
}
