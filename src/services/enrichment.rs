use crate::domain::models::ExternalSpecs;
use crate::services::config::EnrichmentSection;
use crate::services::invoker::{invoke, ProcessInvocation};
use crate::services::output_parser::parse_json_payload;
use std::path::Path;

/// Asks the configured enrichment script about `image`. Every failure mode
/// degrades to `None`; enrichment never fails a request.
pub async fn fetch_external_specs(cfg: &EnrichmentSection, image: &Path) -> Option<ExternalSpecs> {
    let command = cfg.command.as_deref()?;
    let inv = ProcessInvocation::new(command, cfg.timeout_ms)
        .args(cfg.args.iter().cloned())
        .arg(image.to_string_lossy());

    let out = match invoke(&inv).await {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!("enrichment script unavailable: {e}");
            return None;
        }
    };
    if !out.succeeded() {
        tracing::warn!(exit_code = ?out.exit_code, "enrichment script failed");
        return None;
    }
    let specs = parse_json_payload::<ExternalSpecs>(&out.stdout);
    if specs.is_none() {
        tracing::warn!("enrichment script printed no usable JSON");
    }
    specs
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn section(script: &str) -> EnrichmentSection {
        EnrichmentSection {
            command: Some("sh".to_string()),
            args: vec!["-c".to_string(), script.to_string(), "enrich".to_string()],
            timeout_ms: 5_000,
        }
    }

    #[tokio::test]
    async fn parses_script_json() {
        let cfg = section(
            r#"echo "loading model"; echo '{"pixel_size_um": 1.4, "camera_make": "Google"}'"#,
        );
        let specs = fetch_external_specs(&cfg, Path::new("x.jpg"))
            .await
            .expect("specs");
        assert_eq!(specs.pixel_size_um, Some(1.4));
        assert_eq!(specs.camera_make.as_deref(), Some("Google"));
        assert_eq!(specs.actual_focal_length_mm, None);
    }

    #[tokio::test]
    async fn failures_are_no_data() {
        let bad_exit = section(r#"echo '{"pixel_size_um": 1.4}'; exit 2"#);
        assert!(fetch_external_specs(&bad_exit, Path::new("x.jpg")).await.is_none());

        let bad_json = section("echo '{not json'");
        assert!(fetch_external_specs(&bad_json, Path::new("x.jpg")).await.is_none());

        let disabled = EnrichmentSection::default();
        assert!(fetch_external_specs(&disabled, Path::new("x.jpg")).await.is_none());
    }
}
