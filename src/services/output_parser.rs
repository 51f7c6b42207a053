use crate::domain::constants::ENVIRONMENT_INCOMPATIBLE_MARKERS;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

/// One way of pulling a distance out of free text.
pub struct DistanceStrategy {
    pub name: &'static str,
    pattern: Regex,
}

impl DistanceStrategy {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            // Patterns are compile-time constants.
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad {name} pattern: {e}")),
        }
    }

    pub fn apply(&self, text: &str) -> Option<f64> {
        self.pattern
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .find(|v| v.is_finite())
    }
}

/// Strategies in the order they are tried.
pub fn distance_strategies() -> &'static [DistanceStrategy] {
    static STRATEGIES: OnceLock<Vec<DistanceStrategy>> = OnceLock::new();
    STRATEGIES.get_or_init(|| {
        vec![
            DistanceStrategy::new(
                "labeled",
                &format!(r"(?m)[A-Za-z][A-Za-z0-9 _()\-]*:\s*({NUMBER})\s*m\b"),
            ),
            DistanceStrategy::new("bare-meters", &format!(r"({NUMBER})\s*m\b")),
            DistanceStrategy::new("any-number", &format!(r"({NUMBER})")),
        ]
    })
}

pub fn parse_distance(text: &str) -> Option<f64> {
    distance_strategies().iter().find_map(|s| {
        let v = s.apply(text)?;
        tracing::debug!(strategy = s.name, value = v, "parsed distance");
        Some(v)
    })
}

/// Last line of `text` that deserializes into `T`. External scripts may print
/// warnings before their JSON result.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Option<T> {
    if let Ok(v) = serde_json::from_str::<T>(text.trim()) {
        return Some(v);
    }
    text.lines()
        .rev()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .find_map(|l| serde_json::from_str::<T>(l).ok())
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    EnvironmentIncompatible { marker: String },
    ComputationFailed,
    InternalError { reason: String, stderr: String },
}

pub struct Classifier<'a> {
    pub not_located_markers: &'a [String],
}

impl Classifier<'_> {
    pub fn environment_marker(&self, combined: &str) -> Option<&'static str> {
        ENVIRONMENT_INCOMPATIBLE_MARKERS
            .iter()
            .copied()
            .find(|m| combined.contains(m))
    }

    pub fn not_located(&self, combined: &str) -> bool {
        self.not_located_markers
            .iter()
            .any(|m| !m.is_empty() && combined.contains(m.as_str()))
    }

    /// Decides why a completed distance run produced no usable distance.
    /// Returns `None` when the output does carry a distance.
    pub fn classify_failure(
        &self,
        stdout: &str,
        stderr: &str,
        exit_code: Option<i32>,
    ) -> Option<FailureKind> {
        let combined = format!("{stdout}\n{stderr}");
        if let Some(marker) = self.environment_marker(&combined) {
            return Some(FailureKind::EnvironmentIncompatible {
                marker: marker.to_string(),
            });
        }
        if self.not_located(&combined) {
            return Some(FailureKind::ComputationFailed);
        }
        match exit_code {
            Some(0) => {
                if parse_distance(stdout).is_some() {
                    None
                } else {
                    Some(FailureKind::InternalError {
                        reason: "unparseable success output".to_string(),
                        stderr: stderr.to_string(),
                    })
                }
            }
            Some(code) => Some(FailureKind::InternalError {
                reason: format!("exit code {code}"),
                stderr: stderr.to_string(),
            }),
            None => Some(FailureKind::InternalError {
                reason: "terminated by signal".to_string(),
                stderr: stderr.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::DEFAULT_NOT_LOCATED_MARKER;

    fn markers() -> Vec<String> {
        vec![DEFAULT_NOT_LOCATED_MARKER.to_string()]
    }

    #[test]
    fn labeled_scientific_notation() {
        let v = parse_distance("Distance from Earth: 1.04562e+07 m").expect("distance");
        assert!((v - 10_456_200.0).abs() < 1e-3);
    }

    #[test]
    fn labeled_beats_earlier_bare_number() {
        let text = "points=10 radius=6378137\nEstimated distance: 4200.5 m\n";
        assert_eq!(parse_distance(text), Some(4200.5));
    }

    #[test]
    fn bare_meters_then_any_number() {
        assert_eq!(parse_distance("result 12.5 m (approx)"), Some(12.5));
        assert_eq!(parse_distance("42"), Some(42.0));
        assert_eq!(distance_strategies()[1].apply("3 meters"), None);
    }

    #[test]
    fn no_number_is_none() {
        assert_eq!(parse_distance("nothing to see here"), None);
        assert_eq!(parse_distance(""), None);
    }

    #[test]
    fn json_payload_takes_last_json_line() {
        #[derive(serde::Deserialize)]
        struct P {
            success: bool,
        }
        let text = "warning: slow\n{\"success\": false}\n{\"success\": true}\n";
        let p: P = parse_json_payload(text).expect("payload");
        assert!(p.success);
        assert!(parse_json_payload::<P>("not json").is_none());
    }

    #[test]
    fn version_mismatch_has_top_priority() {
        let m = markers();
        let c = Classifier { not_located_markers: &m };
        let stderr = format!(
            "./found: /lib/libstdc++.so.6: version `GLIBCXX_3.4.32' not found\n{}",
            DEFAULT_NOT_LOCATED_MARKER
        );
        assert!(matches!(
            c.classify_failure("", &stderr, Some(1)),
            Some(FailureKind::EnvironmentIncompatible { .. })
        ));
    }

    #[test]
    fn not_located_is_computation_failure() {
        let m = markers();
        let c = Classifier { not_located_markers: &m };
        let out = format!("{DEFAULT_NOT_LOCATED_MARKER} in image\n");
        assert_eq!(
            c.classify_failure(&out, "", Some(1)),
            Some(FailureKind::ComputationFailed)
        );
    }

    #[test]
    fn unknown_failures_are_internal() {
        let m = markers();
        let c = Classifier { not_located_markers: &m };
        match c.classify_failure("", "segfault", Some(139)) {
            Some(FailureKind::InternalError { stderr, .. }) => assert_eq!(stderr, "segfault"),
            other => panic!("unexpected {other:?}"),
        }
        match c.classify_failure("done", "", Some(0)) {
            Some(FailureKind::InternalError { reason, .. }) => {
                assert_eq!(reason, "unparseable success output")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(c.classify_failure("Distance: 5 m", "", Some(0)), None);
    }
}
