//! Camera specification resolution.
//!
//! Sources are applied strictly in priority order and a layer only fills
//! fields that are still unset:
//!
//! 1. manual overrides
//! 2. enrichment script output
//! 3. embedded image metadata
//! 4. device database (only when make and model are known)
//! 5. pixel pitch guessed from image dimensions
//! 6. actual focal length derived from the 35mm equivalent
//!
//! Resolution never fails. Whether the result is usable is the caller's call
//! (see [`CameraSpecification::is_computation_ready`]).

use crate::devices::DeviceSpecDatabase;
use crate::domain::constants::{full_frame_diagonal_mm, DEFAULT_SENSOR_DIAGONAL_MM};
use crate::domain::models::{
    CameraSpecification, ExternalSpecs, PipelineRequest, RawMetadata, SourceTag, SourceTrail,
};

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x > 0.0)
}

fn non_empty(v: Option<&String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Sets `slot` if it is empty and `value` is present.
fn fill<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    if slot.is_none() && value.is_some() {
        *slot = value;
        true
    } else {
        false
    }
}

#[derive(Default)]
struct Draft {
    make: Option<String>,
    model: Option<String>,
    focal_length_mm: Option<f64>,
    pixel_pitch_um: Option<f64>,
    focal_length_35mm: Option<f64>,
    sensor_diagonal_mm: Option<f64>,
    image_width_px: Option<u32>,
    image_height_px: Option<u32>,
    trail: SourceTrail,
}

impl Draft {
    fn finish(self) -> CameraSpecification {
        CameraSpecification {
            make: self.make,
            model: self.model,
            focal_length_mm: self.focal_length_mm,
            pixel_pitch_um: self.pixel_pitch_um,
            focal_length_35mm: self.focal_length_35mm,
            sensor_diagonal_mm: self.sensor_diagonal_mm.unwrap_or(DEFAULT_SENSOR_DIAGONAL_MM),
            image_width_px: self.image_width_px,
            image_height_px: self.image_height_px,
            source_trail: self.trail,
        }
    }
}

/// Pixel pitch from EXIF focal-plane resolution, averaged over both axes.
pub fn pitch_from_focal_plane(m: &RawMetadata) -> Option<f64> {
    let unit = m.focal_plane_resolution_unit?;
    let per_axis: Vec<f64> = [m.focal_plane_x_resolution, m.focal_plane_y_resolution]
        .into_iter()
        .filter_map(positive)
        .map(|res| unit.microns() / res)
        .collect();
    if per_axis.is_empty() {
        return None;
    }
    Some(per_axis.iter().sum::<f64>() / per_axis.len() as f64)
}

/// Typical phone photosite sizes by resolution class. Bounds are exclusive.
pub fn pitch_from_dimensions(width: u32, height: u32) -> f64 {
    if width > 3000 && height > 2000 {
        1.8
    } else if width > 2000 && height > 1500 {
        2.0
    } else {
        2.2
    }
}

pub fn focal_from_35mm(focal_length_35mm: f64, sensor_diagonal_mm: f64) -> f64 {
    focal_length_35mm * (sensor_diagonal_mm / full_frame_diagonal_mm())
}

pub struct SpecResolver<'a> {
    devices: &'a DeviceSpecDatabase,
}

impl<'a> SpecResolver<'a> {
    pub fn new(devices: &'a DeviceSpecDatabase) -> Self {
        Self { devices }
    }

    pub fn resolve(
        &self,
        request: &PipelineRequest,
        external: Option<&ExternalSpecs>,
        metadata: Option<&RawMetadata>,
    ) -> CameraSpecification {
        let mut d = Draft::default();

        let mut manual = fill(&mut d.focal_length_mm, positive(request.manual_focal_length_mm));
        manual |= fill(&mut d.pixel_pitch_um, positive(request.manual_pixel_pitch_um));
        if manual {
            d.trail.record(SourceTag::Manual);
        }

        if let Some(ext) = external {
            if apply_external(&mut d, ext) {
                d.trail.record(SourceTag::ExternalScript);
            }
        }

        if let Some(meta) = metadata {
            if apply_metadata(&mut d, meta) {
                d.trail.record(SourceTag::Metadata);
            }
        }

        if self.apply_database(&mut d) {
            d.trail.record(SourceTag::Database);
        }

        if d.pixel_pitch_um.is_none() {
            if let (Some(w), Some(h)) = (d.image_width_px, d.image_height_px) {
                d.pixel_pitch_um = Some(pitch_from_dimensions(w, h));
                d.trail.record(SourceTag::DimensionHeuristic);
            }
        }

        if d.focal_length_mm.is_none() {
            if let Some(f35) = d.focal_length_35mm {
                let diagonal = d.sensor_diagonal_mm.unwrap_or(DEFAULT_SENSOR_DIAGONAL_MM);
                d.focal_length_mm = Some(focal_from_35mm(f35, diagonal));
            }
        }

        let spec = d.finish();
        tracing::debug!(
            trail = %spec.source_trail,
            focal_length_mm = ?spec.focal_length_mm,
            pixel_pitch_um = ?spec.pixel_pitch_um,
            "resolved camera specification"
        );
        spec
    }

    fn apply_database(&self, d: &mut Draft) -> bool {
        if d.pixel_pitch_um.is_some() && d.focal_length_mm.is_some() {
            return false;
        }
        let (Some(make), Some(model)) = (d.make.as_deref(), d.model.as_deref()) else {
            return false;
        };
        let Some(hit) = self.devices.lookup(make, model) else {
            tracing::debug!(make, model, "no device database match");
            return false;
        };
        tracing::debug!(make, model, tier = %hit.tier, "device database match");
        let mut changed = fill(&mut d.pixel_pitch_um, positive(Some(hit.spec.pixel_pitch_um)));
        changed |= fill(&mut d.focal_length_mm, positive(hit.spec.focal_length_mm));
        changed |= fill(
            &mut d.sensor_diagonal_mm,
            positive(Some(hit.spec.sensor_diagonal_mm)),
        );
        changed
    }
}

fn apply_external(d: &mut Draft, ext: &ExternalSpecs) -> bool {
    let mut changed = fill(&mut d.pixel_pitch_um, positive(ext.pixel_size_um));
    changed |= fill(&mut d.focal_length_mm, positive(ext.actual_focal_length_mm));
    changed |= fill(&mut d.focal_length_35mm, positive(ext.f35_focal_length_mm));
    changed |= fill(&mut d.make, non_empty(ext.camera_make.as_ref()));
    changed |= fill(&mut d.model, non_empty(ext.camera_model.as_ref()));
    changed
}

fn apply_metadata(d: &mut Draft, meta: &RawMetadata) -> bool {
    let mut changed = fill(&mut d.make, non_empty(meta.make.as_ref()));
    changed |= fill(&mut d.model, non_empty(meta.model.as_ref()));
    changed |= fill(&mut d.focal_length_mm, positive(meta.focal_length_mm));
    changed |= fill(&mut d.focal_length_35mm, positive(meta.focal_length_35mm));
    changed |= fill(&mut d.pixel_pitch_um, pitch_from_focal_plane(meta));
    changed |= fill(&mut d.image_width_px, meta.image_width_px.filter(|w| *w > 0));
    changed |= fill(&mut d.image_height_px, meta.image_height_px.filter(|h| *h > 0));
    changed
}
