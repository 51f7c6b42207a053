/// Sensor diagonal assumed for a phone camera when no source reports one.
pub const DEFAULT_SENSOR_DIAGONAL_MM: f64 = 6.15;

/// WGS84 equatorial radius.
pub const DEFAULT_PLANETARY_RADIUS_M: f64 = 6_378_137.0;

pub const DEFAULT_EDGE_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_DISTANCE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 15_000;
pub const DOCTOR_PROBE_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_REFERENCE_ORIENTATION: &str = "0,0,0";

/// Printed by the distance binary when the planetary limb cannot be found.
pub const DEFAULT_NOT_LOCATED_MARKER: &str = "Unable to locate planet";

/// Host runtime libraries older than the distance binary was linked against.
pub const ENVIRONMENT_INCOMPATIBLE_MARKERS: &[&str] = &[
    "GLIBCXX_",
    "GLIBC_2.",
    "CXXABI_",
    "error while loading shared libraries",
];

/// EXIF focal-plane resolution units expressed in micrometres.
pub const MICRONS_PER_INCH: f64 = 25_400.0;
pub const MICRONS_PER_CENTIMETER: f64 = 10_000.0;

/// Diagonal of a 36x24 mm full-frame negative.
pub fn full_frame_diagonal_mm() -> f64 {
    (36.0f64 * 36.0 + 24.0 * 24.0).sqrt()
}
