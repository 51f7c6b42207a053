use crate::domain::constants::DOCTOR_PROBE_TIMEOUT_MS;
use crate::domain::models::{CheckItem, DoctorReport};
use crate::services::config::Config;
use crate::services::invoker::{invoke, InvokeError, ProcessInvocation};
use crate::services::output_parser::Classifier;
use std::path::{Path, PathBuf};

const PASSING: &[&str] = &["ok", "disabled", "not_configured"];

fn check(name: &str, status: &str) -> CheckItem {
    CheckItem {
        name: name.to_string(),
        status: status.to_string(),
    }
}

/// Resolves a bare command name against `PATH`; anything with a separator is
/// taken as a path.
fn find_executable(command: &str) -> Option<PathBuf> {
    let candidate = Path::new(command);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(command))
            .find(|p| p.is_file())
    })
}

fn check_executable(name: &str, command: &str) -> CheckItem {
    check(
        name,
        if find_executable(command).is_some() {
            "ok"
        } else {
            "missing"
        },
    )
}

/// Runs the distance binary once with `--help` and looks for loader errors.
async fn probe_distance(config: &Config) -> CheckItem {
    let d = &config.distance;
    let inv = ProcessInvocation::new(&d.binary, DOCTOR_PROBE_TIMEOUT_MS).arg("--help");
    let status = match invoke(&inv).await {
        Ok(out) => {
            let classifier = Classifier {
                not_located_markers: &d.not_located_markers,
            };
            let combined = format!("{}\n{}", out.stdout, out.stderr);
            match classifier.environment_marker(&combined) {
                Some(marker) => {
                    tracing::warn!(marker, "distance binary cannot load on this host");
                    "environment_incompatible"
                }
                None => "ok",
            }
        }
        Err(InvokeError::Spawn { .. }) => "missing",
        Err(InvokeError::Timeout { .. }) => "unresponsive",
    };
    check("distance-binary", status)
}

fn check_staging(config: &Config) -> CheckItem {
    let root = config.staging_root();
    let writable = std::fs::create_dir_all(&root).is_ok()
        && tempfile::Builder::new()
            .prefix("horizon-doctor-")
            .tempdir_in(&root)
            .is_ok();
    check("staging-dir", if writable { "ok" } else { "not_writable" })
}

pub async fn run_doctor(config: &Config, config_path: Option<&Path>) -> DoctorReport {
    let mut checks = vec![check(
        "config",
        match config_path {
            Some(p) if p.exists() => "ok",
            _ => "not_configured",
        },
    )];

    checks.push(check_executable("edge-command", &config.edge.command));
    if let Some(script) = config
        .edge
        .args
        .iter()
        .find(|a| a.ends_with(".py") || a.contains('/'))
    {
        checks.push(check(
            "edge-script",
            if Path::new(script).is_file() {
                "ok"
            } else {
                "missing"
            },
        ));
    }
    checks.push(probe_distance(config).await);

    checks.push(match &config.enrichment.command {
        Some(cmd) => check_executable("enrichment-command", cmd),
        None => check("enrichment-command", "disabled"),
    });
    checks.push(check(
        "devices-file",
        match &config.pipeline.devices_file {
            Some(p) if p.is_file() => "ok",
            Some(_) => "missing",
            None => "not_configured",
        },
    ));
    checks.push(check_staging(config));

    let all_ok = checks.iter().all(|c| PASSING.contains(&c.status.as_str()));
    DoctorReport {
        overall: if all_ok { "ok" } else { "needs_attention" }.to_string(),
        checks,
    }
}
