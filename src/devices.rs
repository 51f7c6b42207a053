use crate::domain::constants::DEFAULT_SENSOR_DIAGONAL_MM;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

fn default_sensor_diagonal() -> f64 {
    DEFAULT_SENSOR_DIAGONAL_MM
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub pixel_pitch_um: f64,
    #[serde(default = "default_sensor_diagonal")]
    pub sensor_diagonal_mm: f64,
    #[serde(default)]
    pub focal_length_mm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub make: String,
    pub model: String,
    #[serde(flatten)]
    pub spec: DeviceSpec,
}

/// On-disk shape of a user device database.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceDbFile {
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub make_defaults: BTreeMap<String, DeviceSpec>,
    #[serde(default)]
    pub default: Option<DeviceSpec>,
}

#[derive(thiserror::Error, Debug)]
pub enum DeviceDbError {
    #[error("cannot read device database {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid device database {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("device entry {0} has a non-positive pixel pitch")]
    InvalidEntry(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTier {
    Exact,
    Substring,
    TokenSubset,
    MakeDefault,
    GlobalDefault,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchTier::Exact => "exact",
            MatchTier::Substring => "substring",
            MatchTier::TokenSubset => "token-subset",
            MatchTier::MakeDefault => "make-default",
            MatchTier::GlobalDefault => "global-default",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMatch<'a> {
    pub tier: MatchTier,
    /// `None` for make-level and global fallbacks.
    pub entry: Option<&'a DeviceEntry>,
    pub spec: DeviceSpec,
}

/// Read-only table of known phone camera optics.
#[derive(Debug, Clone, Default)]
pub struct DeviceSpecDatabase {
    entries: Vec<DeviceEntry>,
    make_defaults: Vec<(String, DeviceSpec)>,
    default: Option<DeviceSpec>,
}

fn entry(make: &str, model: &str, pixel_pitch_um: f64) -> DeviceEntry {
    DeviceEntry {
        make: make.to_string(),
        model: model.to_string(),
        spec: DeviceSpec {
            pixel_pitch_um,
            sensor_diagonal_mm: DEFAULT_SENSOR_DIAGONAL_MM,
            focal_length_mm: None,
        },
    }
}

fn norm(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

impl DeviceSpecDatabase {
    /// Manufacturer specs and teardown figures for common phones.
    pub fn builtin() -> Self {
        Self::from_entries(vec![
            entry("Apple", "iPhone 14 Pro", 1.22),
            entry("Apple", "iPhone 14", 1.9),
            entry("Apple", "iPhone 13 Pro", 1.9),
            entry("Apple", "iPhone 13", 1.7),
            entry("Samsung", "Galaxy S23 Ultra", 0.8),
            entry("Samsung", "Galaxy S22", 1.08),
            entry("Samsung", "Galaxy S21", 1.8),
            entry("Google", "Pixel 7 Pro", 1.2),
            entry("Google", "Pixel 7", 1.22),
            entry("Google", "Pixel 6", 1.2),
            entry("Xiaomi", "13 Ultra", 1.6),
            entry("Huawei", "P50 Pro", 1.22),
        ])
    }

    pub fn from_entries(entries: Vec<DeviceEntry>) -> Self {
        Self {
            entries,
            make_defaults: Vec::new(),
            default: None,
        }
    }

    #[cfg(test)]
    pub fn with_make_default(mut self, make: &str, spec: DeviceSpec) -> Self {
        self.make_defaults.push((norm(make), spec));
        self
    }

    #[cfg(test)]
    pub fn with_default(mut self, spec: DeviceSpec) -> Self {
        self.default = Some(spec);
        self
    }

    /// Layers a user file over this table. File entries are checked first.
    pub fn extend(mut self, file: DeviceDbFile) -> Result<Self, DeviceDbError> {
        for e in &file.devices {
            if !(e.spec.pixel_pitch_um > 0.0) {
                return Err(DeviceDbError::InvalidEntry(format!("{} {}", e.make, e.model)));
            }
        }
        let mut entries = file.devices;
        entries.append(&mut self.entries);
        self.entries = entries;

        let mut defaults: Vec<(String, DeviceSpec)> = file
            .make_defaults
            .into_iter()
            .map(|(make, spec)| (norm(&make), spec))
            .collect();
        defaults.append(&mut self.make_defaults);
        self.make_defaults = defaults;

        if file.default.is_some() {
            self.default = file.default;
        }
        Ok(self)
    }

    pub fn entries(&self) -> &[DeviceEntry] {
        &self.entries
    }

    pub fn lookup(&self, make: &str, model: &str) -> Option<DeviceMatch<'_>> {
        let make = norm(make);
        let model = norm(model);
        if make.is_empty() {
            return self.default.map(|spec| DeviceMatch {
                tier: MatchTier::GlobalDefault,
                entry: None,
                spec,
            });
        }

        let same_make: Vec<&DeviceEntry> =
            self.entries.iter().filter(|e| norm(&e.make) == make).collect();

        if !model.is_empty() {
            if let Some(e) = same_make.iter().find(|e| norm(&e.model) == model) {
                return Some(Self::hit(MatchTier::Exact, e));
            }

            let substring = most_specific(same_make.iter().copied().filter(|e| {
                let m = norm(&e.model);
                model.contains(&m) || m.contains(&model)
            }));
            if let Some(e) = substring {
                return Some(Self::hit(MatchTier::Substring, e));
            }

            let query_tokens: Vec<&str> = model.split_whitespace().collect();
            let token_subset = most_specific(
                same_make
                    .iter()
                    .copied()
                    .filter(|e| token_subset_match(&norm(&e.model), &query_tokens)),
            );
            if let Some(e) = token_subset {
                return Some(Self::hit(MatchTier::TokenSubset, e));
            }
        }

        if let Some((_, spec)) = self.make_defaults.iter().find(|(m, _)| *m == make) {
            return Some(DeviceMatch {
                tier: MatchTier::MakeDefault,
                entry: None,
                spec: *spec,
            });
        }

        self.default.map(|spec| DeviceMatch {
            tier: MatchTier::GlobalDefault,
            entry: None,
            spec,
        })
    }

    fn hit(tier: MatchTier, e: &DeviceEntry) -> DeviceMatch<'_> {
        DeviceMatch {
            tier,
            entry: Some(e),
            spec: e.spec,
        }
    }
}

/// Longest model name wins; ties keep table order.
fn most_specific<'a>(candidates: impl Iterator<Item = &'a DeviceEntry>) -> Option<&'a DeviceEntry> {
    candidates.fold(None, |best: Option<&DeviceEntry>, e| match best {
        Some(b) if b.model.trim().len() >= e.model.trim().len() => Some(b),
        _ => Some(e),
    })
}

/// Every token of a multi-word database model must appear inside some token of
/// the queried model.
fn token_subset_match(db_model: &str, query_tokens: &[&str]) -> bool {
    let db_tokens: Vec<&str> = db_model.split_whitespace().collect();
    if db_tokens.len() < 2 {
        return false;
    }
    db_tokens
        .iter()
        .all(|t| query_tokens.iter().any(|q| q.contains(t)))
}

pub fn load_device_file(path: &Path) -> Result<DeviceDbFile, DeviceDbError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DeviceDbError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DeviceDbError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(pixel_pitch_um: f64) -> DeviceSpec {
        DeviceSpec {
            pixel_pitch_um,
            sensor_diagonal_mm: DEFAULT_SENSOR_DIAGONAL_MM,
            focal_length_mm: None,
        }
    }

    #[test]
    fn exact_match_ignores_case() {
        let db = DeviceSpecDatabase::builtin();
        let m = db.lookup("APPLE", "iphone 13").expect("match");
        assert_eq!(m.tier, MatchTier::Exact);
        assert_eq!(m.spec.pixel_pitch_um, 1.7);
    }

    #[test]
    fn pro_max_resolves_to_pro_entry_only_database() {
        let db = DeviceSpecDatabase::from_entries(vec![entry("Apple", "iPhone 14 Pro", 1.22)]);
        let m = db.lookup("Apple", "iPhone 14 Pro Max").expect("match");
        assert_eq!(m.spec.pixel_pitch_um, 1.22);
        assert_eq!(m.entry.map(|e| e.model.as_str()), Some("iPhone 14 Pro"));
    }

    #[test]
    fn substring_prefers_most_specific_model() {
        let db = DeviceSpecDatabase::builtin();
        let m = db.lookup("Apple", "iPhone 14 Pro Max").expect("match");
        assert_eq!(m.tier, MatchTier::Substring);
        assert_eq!(m.spec.pixel_pitch_um, 1.22);
    }

    #[test]
    fn token_subset_handles_interleaved_tokens() {
        let db = DeviceSpecDatabase::from_entries(vec![entry("Samsung", "Galaxy S23 Ultra", 0.8)]);
        let m = db.lookup("samsung", "SM Galaxy S23 (5G) Ultra").expect("match");
        assert_eq!(m.tier, MatchTier::TokenSubset);
        assert_eq!(m.spec.pixel_pitch_um, 0.8);
    }

    #[test]
    fn single_word_models_do_not_token_match() {
        let db = DeviceSpecDatabase::from_entries(vec![entry("Acme", "Cam", 3.0)]);
        assert!(db.lookup("Acme", "Mega Zoom").is_none());
    }

    #[test]
    fn fallbacks_apply_in_order() {
        let db = DeviceSpecDatabase::builtin()
            .with_make_default("Apple", spec(1.5))
            .with_default(spec(2.5));

        let make_level = db.lookup("Apple", "Vision Cam").expect("make default");
        assert_eq!(make_level.tier, MatchTier::MakeDefault);
        assert_eq!(make_level.spec.pixel_pitch_um, 1.5);

        let global = db.lookup("Nokia", "3310").expect("global default");
        assert_eq!(global.tier, MatchTier::GlobalDefault);
        assert_eq!(global.spec.pixel_pitch_um, 2.5);
    }

    #[test]
    fn builtin_has_no_invented_fallbacks() {
        let db = DeviceSpecDatabase::builtin();
        assert!(db.lookup("Nokia", "3310").is_none());
        assert!(db.lookup("Apple", "Vision Cam").is_none());
    }

    #[test]
    fn user_entries_shadow_builtin() {
        let file: DeviceDbFile = serde_json::from_str(
            r#"{"devices":[{"make":"Apple","model":"iPhone 13","pixel_pitch_um":1.9}],
                "make_defaults":{"google":{"pixel_pitch_um":1.4}}}"#,
        )
        .expect("valid db json");
        let db = DeviceSpecDatabase::builtin().extend(file).expect("extend");
        assert_eq!(db.lookup("Apple", "iPhone 13").expect("match").spec.pixel_pitch_um, 1.9);
        let g = db.lookup("Google", "Pixel Fold").expect("make default");
        assert_eq!(g.tier, MatchTier::MakeDefault);
        assert_eq!(g.spec.sensor_diagonal_mm, DEFAULT_SENSOR_DIAGONAL_MM);
    }

    #[test]
    fn extend_rejects_non_positive_pitch() {
        let file: DeviceDbFile = serde_json::from_str(
            r#"{"devices":[{"make":"Acme","model":"Zero","pixel_pitch_um":0.0}]}"#,
        )
        .expect("valid db json");
        assert!(matches!(
            DeviceSpecDatabase::builtin().extend(file),
            Err(DeviceDbError::InvalidEntry(_))
        ));
    }
}
