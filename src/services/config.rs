use crate::domain::constants::{
    DEFAULT_DISTANCE_TIMEOUT_MS, DEFAULT_EDGE_TIMEOUT_MS, DEFAULT_ENRICHMENT_TIMEOUT_MS,
    DEFAULT_NOT_LOCATED_MARKER, DEFAULT_PLANETARY_RADIUS_M, DEFAULT_REFERENCE_ORIENTATION,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub edge: EdgeSection,
    pub distance: DistanceSection,
    pub enrichment: EnrichmentSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub planetary_radius_m: f64,
    pub staging_dir: Option<PathBuf>,
    pub devices_file: Option<PathBuf>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            planetary_radius_m: DEFAULT_PLANETARY_RADIUS_M,
            staging_dir: None,
            devices_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EdgeSection {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for EdgeSection {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["edge_detection.py".to_string()],
            timeout_ms: DEFAULT_EDGE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistanceSection {
    pub binary: String,
    pub timeout_ms: u64,
    pub reference_orientation: String,
    pub not_located_markers: Vec<String>,
}

impl Default for DistanceSection {
    fn default() -> Self {
        Self {
            binary: "./found".to_string(),
            timeout_ms: DEFAULT_DISTANCE_TIMEOUT_MS,
            reference_orientation: DEFAULT_REFERENCE_ORIENTATION.to_string(),
            not_located_markers: vec![DEFAULT_NOT_LOCATED_MARKER.to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentSection {
    /// Enrichment is skipped when unset.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for EnrichmentSection {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_ms: DEFAULT_ENRICHMENT_TIMEOUT_MS,
        }
    }
}

impl Config {
    pub fn staging_root(&self) -> PathBuf {
        self.pipeline
            .staging_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let radius = self.pipeline.planetary_radius_m;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::Invalid {
                field: "pipeline.planetary_radius_m",
                reason: format!("must be positive, got {radius}"),
            });
        }
        for (field, ms) in [
            ("edge.timeout_ms", self.edge.timeout_ms),
            ("distance.timeout_ms", self.distance.timeout_ms),
            ("enrichment.timeout_ms", self.enrichment.timeout_ms),
        ] {
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.edge.command.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "edge.command",
                reason: "must not be empty".to_string(),
            });
        }
        if self.distance.binary.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "distance.binary",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config/horizon/config.toml"))
}

pub fn parse_config(raw: &str, path: &Path) -> Result<Config, ConfigError> {
    let cfg: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate()?;
    Ok(cfg)
}

/// An explicit path must exist; the default location may be absent.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };
    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse_config(&raw, &path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("", Path::new("c.toml")).expect("defaults");
        assert_eq!(cfg.pipeline.planetary_radius_m, DEFAULT_PLANETARY_RADIUS_M);
        assert_eq!(cfg.edge.timeout_ms, 60_000);
        assert_eq!(cfg.distance.timeout_ms, 30_000);
        assert!(cfg.enrichment.command.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_config(
            r#"
[distance]
binary = "/opt/found/bin/found"
timeout_ms = 1000
"#,
            Path::new("c.toml"),
        )
        .expect("parse");
        assert_eq!(cfg.distance.binary, "/opt/found/bin/found");
        assert_eq!(cfg.distance.reference_orientation, "0,0,0");
        assert_eq!(cfg.distance.not_located_markers, vec![DEFAULT_NOT_LOCATED_MARKER]);
    }

    #[test]
    fn rejects_zero_timeout_and_bad_radius() {
        let err = parse_config("[edge]\ntimeout_ms = 0\n", Path::new("c.toml")).unwrap_err();
        assert!(err.to_string().contains("edge.timeout_ms"));
        let err = parse_config("[pipeline]\nplanetary_radius_m = -1.0\n", Path::new("c.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("planetary_radius_m"));
    }
}
