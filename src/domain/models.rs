use crate::domain::constants::{
    DEFAULT_PLANETARY_RADIUS_M, DEFAULT_SENSOR_DIAGONAL_MM, MICRONS_PER_CENTIMETER,
    MICRONS_PER_INCH,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct ErrorOut<'a> {
    pub ok: bool,
    pub error: ErrorBody<'a>,
}

#[derive(Serialize)]
pub struct ErrorBody<'a> {
    pub code: &'a str,
    pub message: String,
}

/// Which source contributed to a resolved specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    Manual,
    ExternalScript,
    Metadata,
    Database,
    DimensionHeuristic,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceTag::Manual => "manual",
            SourceTag::ExternalScript => "external-script",
            SourceTag::Metadata => "metadata",
            SourceTag::Database => "database",
            SourceTag::DimensionHeuristic => "dimension-heuristic",
        };
        f.write_str(s)
    }
}

/// Contribution order of sources, duplicates collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTrail(Vec<SourceTag>);

impl SourceTrail {
    pub fn record(&mut self, tag: SourceTag) {
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    #[cfg(test)]
    pub fn contains(&self, tag: SourceTag) -> bool {
        self.0.contains(&tag)
    }

    #[cfg(test)]
    pub fn tags(&self) -> &[SourceTag] {
        &self.0
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SourceTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|t| t.to_string()).collect();
        f.write_str(&parts.join(" > "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSpecification {
    pub make: Option<String>,
    pub model: Option<String>,
    pub focal_length_mm: Option<f64>,
    pub pixel_pitch_um: Option<f64>,
    pub focal_length_35mm: Option<f64>,
    pub sensor_diagonal_mm: f64,
    pub image_width_px: Option<u32>,
    pub image_height_px: Option<u32>,
    pub source_trail: SourceTrail,
}

impl Default for CameraSpecification {
    fn default() -> Self {
        Self {
            make: None,
            model: None,
            focal_length_mm: None,
            pixel_pitch_um: None,
            focal_length_35mm: None,
            sensor_diagonal_mm: DEFAULT_SENSOR_DIAGONAL_MM,
            image_width_px: None,
            image_height_px: None,
            source_trail: SourceTrail::default(),
        }
    }
}

impl CameraSpecification {
    pub fn is_computation_ready(&self) -> bool {
        matches!(self.focal_length_mm, Some(f) if f > 0.0)
            && matches!(self.pixel_pitch_um, Some(p) if p > 0.0)
    }

    /// Names of the fields that block computation, for user-facing messages.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !matches!(self.focal_length_mm, Some(f) if f > 0.0) {
            out.push("focal length");
        }
        if !matches!(self.pixel_pitch_um, Some(p) if p > 0.0) {
            out.push("pixel pitch");
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub image_path: PathBuf,
    pub planetary_radius_m: f64,
    pub manual_focal_length_mm: Option<f64>,
    pub manual_pixel_pitch_um: Option<f64>,
}

impl PipelineRequest {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            planetary_radius_m: DEFAULT_PLANETARY_RADIUS_M,
            manual_focal_length_mm: None,
            manual_pixel_pitch_um: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    NeedsManualInput,
    ComputationFailed,
    EnvironmentIncompatible,
    InternalError,
}

impl PipelineStatus {
    /// Only unexpected failures are reported as a server fault; the other
    /// terminal states are normal answers.
    pub fn is_server_fault(self) -> bool {
        matches!(self, PipelineStatus::InternalError)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub status: PipelineStatus,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_points_count: Option<u64>,
    pub camera_specification: CameraSpecification,
    pub diagnostic_message: String,
}

impl PipelineResult {
    pub fn success(
        distance_meters: f64,
        edge_points_count: u64,
        camera_specification: CameraSpecification,
    ) -> Self {
        Self {
            status: PipelineStatus::Success,
            success: true,
            distance_meters: Some(distance_meters),
            edge_points_count: Some(edge_points_count),
            camera_specification,
            diagnostic_message: format!("Estimated distance: {:.0} m", distance_meters),
        }
    }

    pub fn failure(
        status: PipelineStatus,
        camera_specification: CameraSpecification,
        diagnostic_message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            success: false,
            distance_meters: None,
            edge_points_count: None,
            camera_specification,
            diagnostic_message: diagnostic_message.into(),
        }
    }

    pub fn with_edge_points(mut self, count: u64) -> Self {
        self.edge_points_count = Some(count);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionUnit {
    Inch,
    Centimeter,
}

impl ResolutionUnit {
    /// EXIF `FocalPlaneResolutionUnit`: 2 = inch, 3 = centimetre. Other codes
    /// carry no absolute unit.
    pub fn from_exif_code(code: u32) -> Option<Self> {
        match code {
            2 => Some(ResolutionUnit::Inch),
            3 => Some(ResolutionUnit::Centimeter),
            _ => None,
        }
    }

    pub fn microns(self) -> f64 {
        match self {
            ResolutionUnit::Inch => MICRONS_PER_INCH,
            ResolutionUnit::Centimeter => MICRONS_PER_CENTIMETER,
        }
    }
}

/// Fields read from the image's embedded metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub focal_length_mm: Option<f64>,
    #[serde(default)]
    pub focal_length_35mm: Option<f64>,
    #[serde(default)]
    pub focal_plane_x_resolution: Option<f64>,
    #[serde(default)]
    pub focal_plane_y_resolution: Option<f64>,
    #[serde(default)]
    pub focal_plane_resolution_unit: Option<ResolutionUnit>,
    #[serde(default)]
    pub image_width_px: Option<u32>,
    #[serde(default)]
    pub image_height_px: Option<u32>,
}

impl RawMetadata {
    pub fn is_empty(&self) -> bool {
        self == &RawMetadata::default()
    }
}

/// JSON printed by the enrichment script.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExternalSpecs {
    #[serde(default)]
    pub pixel_size_um: Option<f64>,
    #[serde(default)]
    pub actual_focal_length_mm: Option<f64>,
    #[serde(default)]
    pub f35_focal_length_mm: Option<f64>,
    #[serde(default)]
    pub camera_make: Option<String>,
    #[serde(default)]
    pub camera_model: Option<String>,
}

/// JSON printed by the edge extractor.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeExtraction {
    pub success: bool,
    #[serde(default)]
    pub edge_points_count: u64,
    #[serde(default)]
    pub edge_points_file: Option<PathBuf>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ResolveReport {
    pub computation_ready: bool,
    pub missing: Vec<&'static str>,
    pub camera_specification: CameraSpecification,
}

#[derive(Serialize)]
pub struct DeviceReport {
    pub make: String,
    pub model: String,
    pub tier: String,
    pub pixel_pitch_um: f64,
    pub sensor_diagonal_mm: f64,
    pub focal_length_mm: Option<f64>,
}

#[derive(Serialize)]
pub struct FocalReport {
    pub focal_length_35mm: f64,
    pub sensor_diagonal_mm: f64,
    pub focal_length_mm: f64,
}

#[derive(Serialize)]
pub struct CheckItem {
    pub name: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct DoctorReport {
    pub overall: String,
    pub checks: Vec<CheckItem>,
}
